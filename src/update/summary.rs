//! Run-wide accumulation of reconciliation results

use crate::manifest::Reconciliation;
use crate::manifest::model::sort_versions;
use serde::Serialize;
use std::fmt;

/// Why a stack build was left out of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
  /// Build result has no `source.url`
  MissingSourceUrl,
  /// Build file names a stack that is not configured
  UnknownStack,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::MissingSourceUrl => write!(f, "build has no source.url"),
      SkipReason::UnknownStack => write!(f, "stack is not configured"),
    }
  }
}

/// A stack build that was not applied
#[derive(Debug, Clone, Serialize)]
pub struct SkippedBuild {
  pub stack: String,
  pub reason: SkipReason,
}

/// Added/removed versions and stacks across every applied stack build
///
/// Each applied reconciliation folds into the summary through [`UpdateSummary::absorb`].
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
  /// Build name of the dependency
  pub dependency: String,
  /// Version this run is about
  pub version: String,
  pub added: Vec<String>,
  pub removed: Vec<String>,
  /// Stack ids the applied builds targeted, first-seen order
  pub stacks: Vec<String>,
  pub skipped: Vec<SkippedBuild>,
  /// Number of applied stack builds
  pub applied: usize,
  /// Number of applied stack builds whose version was already present
  pub rebuilt_builds: usize,
}

impl UpdateSummary {
  pub fn new(dependency: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      dependency: dependency.into(),
      version: version.into(),
      added: Vec::new(),
      removed: Vec::new(),
      stacks: Vec::new(),
      skipped: Vec::new(),
      applied: 0,
      rebuilt_builds: 0,
    }
  }

  /// Fold one applied reconciliation into the summary
  pub fn absorb(mut self, stacks: &[String], reconciliation: &Reconciliation) -> Self {
    self.added.extend(reconciliation.added.iter().cloned());
    self.removed.extend(reconciliation.removed.iter().cloned());
    sort_versions(&mut self.added);
    sort_versions(&mut self.removed);

    for stack in stacks {
      if !self.stacks.contains(stack) {
        self.stacks.push(stack.clone());
      }
    }

    self.applied += 1;
    if reconciliation.rebuilt {
      self.rebuilt_builds += 1;
    }
    self
  }

  /// Record a stack build that was left out
  pub fn skip(mut self, stack: impl Into<String>, reason: SkipReason) -> Self {
    self.skipped.push(SkippedBuild {
      stack: stack.into(),
      reason,
    });
    self
  }

  /// Every applied stack build was a rebuild of a version already present
  pub fn rebuilt(&self) -> bool {
    self.applied > 0 && self.rebuilt_builds == self.applied
  }

  /// Nothing new was added and nothing was rebuilt
  pub fn is_noop(&self) -> bool {
    self.added.is_empty() && !self.rebuilt()
  }

  /// Commit message describing the run
  pub fn commit_message(&self, story_id: Option<&str>) -> String {
    let verb = if self.rebuilt() { "Rebuild" } else { "Add" };
    let mut message = format!("{} {} {}", verb, self.dependency, self.version);

    if !self.removed.is_empty() {
      message.push_str(&format!(", remove {} {}", self.dependency, self.removed.join(", ")));
    }
    message.push_str(&format!("\n\nfor stack(s) {}", self.stacks.join(", ")));

    if let Some(story) = story_id {
      message.push_str(&format!(" [#{}]", story));
    }
    message
  }
}
