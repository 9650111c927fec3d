//! Dependency catalog: manifest ids, display names and source references
//!
//! The pipeline names dependencies by their build name (`source.name`). A handful of
//! families are published under a different manifest id, carry a display name, or
//! need their source reference rewritten. Anything not listed here falls back to the
//! build name as `id` and no display name.

use super::BuildRecord;
use crate::core::config::DependencyOverride;
use crate::manifest::{SourceKind, SourceReference};

const APPDYNAMICS_LEGAL_NOTICES: &str = "https://docs.appdynamics.com/display/DASH/Legal+Notices";
const CAAPM_ACKNOWLEDGMENTS: &str = "https://docops.ca.com/ca-apm/10-5/en/ca-apm-release-notes/third-party-software-acknowledgments/php-agents-third-party-software-acknowledgments";

/// Built-in manifest id for a build name
fn builtin_id(name: &str) -> Option<&'static str> {
  match name {
    "php" => Some("php-binary"),
    _ => None,
  }
}

/// Built-in display name for a build name
fn builtin_display_name(name: &str) -> Option<&'static str> {
  match name {
    "node" => Some("Node Engine"),
    "yarn" => Some("Yarn"),
    "python" => Some("Python"),
    "php" => Some("PHP"),
    "httpd" => Some("Apache HTTP Server"),
    _ => None,
  }
}

/// Catalog lookups with config overrides applied on top of the built-in table
pub struct Catalog<'a> {
  overrides: &'a [DependencyOverride],
}

impl<'a> Catalog<'a> {
  pub fn new(overrides: &'a [DependencyOverride]) -> Self {
    Self { overrides }
  }

  fn find(&self, name: &str) -> Option<&DependencyOverride> {
    self.overrides.iter().find(|o| o.name == name)
  }

  /// Manifest id; defaults to the build name
  pub fn dependency_id(&self, name: &str) -> String {
    self
      .find(name)
      .and_then(|o| o.id.clone())
      .or_else(|| builtin_id(name).map(str::to_string))
      .unwrap_or_else(|| name.to_string())
  }

  /// Human-readable name, if one is known
  pub fn display_name(&self, name: &str) -> Option<String> {
    self
      .find(name)
      .and_then(|o| o.display_name.clone())
      .or_else(|| builtin_display_name(name).map(str::to_string))
  }
}

/// Source reference and checksum recorded for a build
///
/// Returns `None` when the build carries no `source.url`.
pub fn resolve_source(name: &str, build: &BuildRecord) -> Option<(SourceReference, String)> {
  let source = build.source.as_ref()?;
  let url = source.url.clone()?;
  let checksum = source.sha256.clone().unwrap_or_default();

  let reference = if name.contains("dotnet") {
    let sha = build.git_commit_sha.as_deref().unwrap_or_default();
    SourceReference {
      kind: SourceKind::Source,
      url: format!("{}/archive/{}.tar.gz", url, sha),
    }
  } else if name == "appdynamics" {
    SourceReference {
      kind: SourceKind::Osl,
      url: APPDYNAMICS_LEGAL_NOTICES.to_string(),
    }
  } else if name == "CAAPM" {
    SourceReference {
      kind: SourceKind::Osl,
      url: CAAPM_ACKNOWLEDGMENTS.to_string(),
    }
  } else if name.contains("miniconda") {
    SourceReference {
      kind: SourceKind::Source,
      url: format!("https://github.com/conda/conda/archive/{}.tar.gz", build.version),
    }
  } else {
    SourceReference {
      kind: SourceKind::Source,
      url,
    }
  };

  Some((reference, checksum))
}
