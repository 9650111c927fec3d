//! Build pipeline inputs
//!
//! Reads the already-fetched JSON produced by the binary build pipeline:
//!
//! - `source/data.json`: which dependency and version this run is about
//! - `<builds>/<name>/<version>.json`: optional tracker story for the commit message
//! - `<builds>/<name>/<version>-<stack>.json`: one build result per stack
//!
//! - **catalog**: manifest ids, display names and source rewriting per dependency family

pub mod catalog;

use crate::core::config::ANY_STACK;
use crate::core::error::{ResultExt, UpdateResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Dependency name and version of the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceData {
  /// Build name, e.g. "node" or "php"
  pub name: String,
  /// Version being added, e.g. "14.3.0"
  pub version: String,
}

#[derive(Deserialize)]
struct SourceDataFile {
  source: SourceNameField,
  version: VersionRefField,
}

#[derive(Deserialize)]
struct SourceNameField {
  name: String,
}

#[derive(Deserialize)]
struct VersionRefField {
  #[serde(rename = "ref")]
  reference: String,
}

impl SourceData {
  /// Load `source/data.json`
  pub fn load(path: &Path) -> UpdateResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data: SourceDataFile =
      serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Self {
      name: data.source.name,
      version: data.version.reference,
    })
  }
}

/// `source` sub-record of a build result
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSource {
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub sha256: Option<String>,
}

/// One build result for one stack (or for all stacks)
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRecord {
  #[serde(default)]
  pub version: String,
  pub url: String,
  pub sha256: String,
  #[serde(default)]
  pub source: Option<BuildSource>,
  #[serde(default)]
  pub git_commit_sha: Option<String>,
}

impl BuildRecord {
  /// Load a build result file
  pub fn load(path: &Path) -> UpdateResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse build record {}", path.display()))
  }
}

/// Which stacks a build result targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackTarget {
  /// Stack-independent build, applies to every configured stack
  Any,
  /// Build for one stack, by short name
  Named(String),
}

/// A discovered `<version>-<stack>.json` build result
#[derive(Debug, Clone)]
pub struct StackBuildFile {
  pub path: PathBuf,
  pub target: StackTarget,
}

impl StackBuildFile {
  /// Short stack label used in output
  pub fn label(&self) -> &str {
    match &self.target {
      StackTarget::Any => ANY_STACK,
      StackTarget::Named(name) => name,
    }
  }
}

/// Find the per-stack build results of `name` at `version`, sorted by file name
///
/// A missing build directory yields no builds.
pub fn discover_stack_builds(builds_dir: &Path, name: &str, version: &str) -> UpdateResult<Vec<StackBuildFile>> {
  let dir = builds_dir.join(name);
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let prefix = format!("{}-", version);
  let mut builds = Vec::new();
  for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
    let entry = entry?;
    let file_name = entry.file_name();
    let file_name = file_name.to_string_lossy();

    let Some(stack) = file_name
      .strip_prefix(&prefix)
      .and_then(|rest| rest.strip_suffix(".json"))
      .filter(|s| !s.is_empty())
    else {
      continue;
    };

    let target = if stack == ANY_STACK {
      StackTarget::Any
    } else {
      StackTarget::Named(stack.to_string())
    };
    builds.push(StackBuildFile {
      path: entry.path(),
      target,
    });
  }

  builds.sort_by(|a, b| a.path.cmp(&b.path));
  Ok(builds)
}

/// Tracker story id recorded next to the build results, if any
pub fn tracker_story_id(builds_dir: &Path, name: &str, version: &str) -> Option<String> {
  let path = builds_dir.join(name).join(format!("{}.json", version));
  let content = fs::read_to_string(path).ok()?;
  let json: serde_json::Value = serde_json::from_str(&content).ok()?;

  match json.get("tracker_story_id")? {
    serde_json::Value::Number(n) => Some(n.to_string()),
    serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
    _ => None,
  }
}
