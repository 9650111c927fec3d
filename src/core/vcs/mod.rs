pub mod system_git;

pub use system_git::SystemGit;

use crate::core::error::UpdateResult;
use std::path::PathBuf;

/// Something that can record files in version control
pub trait CommitSink {
  /// Stage `files` and commit them with `message`
  ///
  /// Returns the new commit SHA, or `None` when nothing changed.
  fn commit(&self, files: &[PathBuf], message: &str) -> UpdateResult<Option<String>>;
}
