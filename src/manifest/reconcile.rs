//! Dependency-list reconciliation
//!
//! Given a freshly built dependency record, decides which existing manifest entries it
//! replaces and produces the new, sorted dependency list.
//!
//! # Siblings
//!
//! Entries with the same `id` whose stacks overlap the new record's stacks. Entries of
//! the same `id` on disjoint stacks belong to a different stack-build and are passed
//! through untouched, exactly like entries of other dependencies.
//!
//! Removal and replacement are scoped to the new record's stacks. A sibling that serves
//! more stacks than the new record keeps the stacks the new record does not cover, so a
//! per-stack build of a combined entry splits it instead of conflicting with it or
//! dropping the other stacks.

use super::model::{DependencyList, DependencyRecord, sort_dependencies, sort_versions};
use super::version_line::{VersionLineType, classify};
use crate::core::error::ReconcileError;
use std::fmt;
use std::str::FromStr;

/// How aggressively older siblings are pruned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalStrategy {
  /// Never remove anything
  #[default]
  None,
  /// Remove every sibling on the new record's version line
  Line,
  /// Remove siblings on the new record's line only if they were already released
  ReleasedOnly,
}

impl fmt::Display for RemovalStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RemovalStrategy::None => "none",
      RemovalStrategy::Line => "line",
      RemovalStrategy::ReleasedOnly => "released-only",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for RemovalStrategy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().replace('_', "-").as_str() {
      "" | "none" => Ok(RemovalStrategy::None),
      "line" => Ok(RemovalStrategy::Line),
      "released-only" => Ok(RemovalStrategy::ReleasedOnly),
      other => Err(format!(
        "unknown removal strategy '{}' (expected none, line or released-only)",
        other
      )),
    }
  }
}

/// Result of one reconciliation call
#[derive(Debug, Clone)]
pub struct Reconciliation {
  /// Updated dependency list, sorted by (id, version)
  pub dependencies: DependencyList,
  /// Versions of the record's id present now but not before
  pub added: Vec<String>,
  /// Versions of the record's id present before but not now
  pub removed: Vec<String>,
  /// The record's version was already in the list before the call
  pub rebuilt: bool,
}

/// Insert `new_record` into `existing`, pruning siblings per `strategy`
pub fn reconcile(
  new_record: &DependencyRecord,
  line_type: VersionLineType,
  strategy: RemovalStrategy,
  existing: &[DependencyRecord],
  released: &[DependencyRecord],
) -> Result<Reconciliation, ReconcileError> {
  let line = classify(&new_record.version, line_type)?;

  let (siblings, unrelated): (Vec<&DependencyRecord>, Vec<&DependencyRecord>) = existing
    .iter()
    .partition(|d| d.id == new_record.id && d.shares_stack_with(new_record));

  let mut dependencies: DependencyList = unrelated.into_iter().cloned().collect();
  let mut replaced = false;
  for sibling in siblings {
    let on_line = match &line {
      Some(line) => classify(&sibling.version, line_type)?.as_ref() == Some(line),
      None => false,
    };

    let remove = on_line
      && match strategy {
        RemovalStrategy::None => false,
        RemovalStrategy::Line => true,
        RemovalStrategy::ReleasedOnly => released
          .iter()
          .any(|r| r.id == new_record.id && r.version == sibling.version),
      };
    if !remove && sibling.version != new_record.version {
      dependencies.push(sibling.clone());
    } else if !remove && !replaced && sibling.same_stacks(new_record) {
      dependencies.push(new_record.clone());
      replaced = true;
    } else if let Some(rest) = sibling.without_stacks_of(new_record) {
      // stacks the new record was not built for keep the sibling
      dependencies.push(rest);
    }
  }
  if !replaced {
    dependencies.push(new_record.clone());
  }
  sort_dependencies(&mut dependencies);

  check_stack_conflicts(&dependencies, &new_record.id)?;

  let before = versions_of(existing, &new_record.id);
  let after = versions_of(&dependencies, &new_record.id);
  let mut added: Vec<String> = after.iter().filter(|v| !before.contains(v)).cloned().collect();
  let mut removed: Vec<String> = before.iter().filter(|v| !after.contains(v)).cloned().collect();
  sort_versions(&mut added);
  sort_versions(&mut removed);

  Ok(Reconciliation {
    rebuilt: before.contains(&new_record.version),
    dependencies,
    added,
    removed,
  })
}

fn versions_of(deps: &[DependencyRecord], id: &str) -> Vec<String> {
  deps.iter().filter(|d| d.id == id).map(|d| d.version.clone()).collect()
}

/// No two records of `id` with the same version may serve a common stack
///
/// Only a manifest that already held overlapping entries can trip this.
fn check_stack_conflicts(deps: &[DependencyRecord], id: &str) -> Result<(), ReconcileError> {
  let group: Vec<&DependencyRecord> = deps.iter().filter(|d| d.id == id).collect();

  for (i, a) in group.iter().enumerate() {
    for b in &group[i + 1..] {
      if a.version == b.version && a.shares_stack_with(b) {
        return Err(ReconcileError::ConflictingStacks {
          id: id.to_string(),
          version: a.version.clone(),
          stacks: a.common_stacks(b),
        });
      }
    }
  }

  Ok(())
}
