//! System git backend
//!
//! Runs the `git` binary with an isolated environment. Only the handful of porcelain
//! commands needed to commit a manifest are wrapped here.

use super::CommitSink;
use crate::core::error::{GitError, ResultExt, UpdateError, UpdateResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> UpdateResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(UpdateError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(UpdateError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Set a repository-local config value
  pub fn set_config(&self, key: &str, value: &str) -> UpdateResult<()> {
    self.run(&["config", key, value], "git config")?;
    Ok(())
  }

  /// Stage a file (path relative to the repository directory)
  pub fn add_file(&self, path: &Path) -> UpdateResult<()> {
    let path = path.to_string_lossy();
    self.run(&["add", "--", path.as_ref()], "git add")?;
    Ok(())
  }

  /// True when the index differs from HEAD
  pub fn has_staged_changes(&self) -> UpdateResult<bool> {
    let output = self
      .git_cmd()
      .args(["diff", "--cached", "--quiet"])
      .output()
      .context("Failed to run git diff")?;

    // --quiet exits 1 when there are differences
    match output.status.code() {
      Some(0) => Ok(false),
      Some(1) => Ok(true),
      _ => Err(UpdateError::Git(GitError::CommandFailed {
        command: "git diff --cached --quiet".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      })),
    }
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> UpdateResult<String> {
    let output = self.run(&["rev-parse", "HEAD"], "git rev-parse HEAD")?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Commit the index only if something is staged
  pub fn safe_commit(&self, message: &str) -> UpdateResult<Option<String>> {
    if !self.has_staged_changes()? {
      return Ok(None);
    }

    self.run(&["commit", "-m", message], "git commit")?;
    self.head_commit().map(Some)
  }

  fn run(&self, args: &[&str], command: &str) -> UpdateResult<Output> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute {}", command))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(UpdateError::Git(GitError::CommandFailed {
        command: command.to_string(),
        stderr: stderr.to_string(),
      }));
    }

    Ok(output)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII
    cmd.arg("-c").arg("commit.gpgSign=false");

    cmd
  }
}

impl CommitSink for SystemGit {
  fn commit(&self, files: &[PathBuf], message: &str) -> UpdateResult<Option<String>> {
    for file in files {
      self.add_file(file)?;
    }
    self.safe_commit(message)
  }
}
