//! Typed view of `metadata.dependencies` and `metadata.dependency_deprecation_dates`

use std::cmp::Ordering;

/// Which key the source reference is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
  /// Upstream source archive
  Source,
  /// Open-source-license acknowledgement page
  Osl,
}

impl SourceKind {
  /// Manifest key for this kind
  pub fn key(self) -> &'static str {
    match self {
      SourceKind::Source => "source",
      SourceKind::Osl => "osl",
    }
  }
}

/// Tagged `source`/`osl` URL of a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
  pub kind: SourceKind,
  pub url: String,
}

/// One dependency build for one set of stacks
///
/// Constructed once per stack-build and never mutated afterwards; reconciliation
/// produces new lists instead.
#[derive(Debug, Clone)]
pub struct DependencyRecord {
  pub id: String,
  pub name: Option<String>,
  pub version: String,
  pub uri: String,
  pub sha256: String,
  /// Stack ids in manifest order; compared as a set
  pub stacks: Vec<String>,
  pub source: Option<SourceReference>,
  pub source_sha256: String,
  /// Keys of an existing entry that are not modelled above
  pub extra: toml_edit::Table,
}

impl DependencyRecord {
  /// True when both records serve at least one common stack
  pub fn shares_stack_with(&self, other: &DependencyRecord) -> bool {
    self.stacks.iter().any(|s| other.stacks.contains(s))
  }

  /// True when both records serve exactly the same stacks
  pub fn same_stacks(&self, other: &DependencyRecord) -> bool {
    self.stacks.iter().all(|s| other.stacks.contains(s)) && other.stacks.iter().all(|s| self.stacks.contains(s))
  }

  /// Copy of this record without the stacks `other` serves, `None` if nothing is left
  pub fn without_stacks_of(&self, other: &DependencyRecord) -> Option<DependencyRecord> {
    let stacks: Vec<String> = self.stacks.iter().filter(|s| !other.stacks.contains(s)).cloned().collect();
    if stacks.is_empty() {
      return None;
    }
    Some(DependencyRecord {
      stacks,
      ..self.clone()
    })
  }

  /// Stacks served by both records
  pub fn common_stacks(&self, other: &DependencyRecord) -> Vec<String> {
    self.stacks.iter().filter(|s| other.stacks.contains(s)).cloned().collect()
  }
}

/// Ordered dependency list of one manifest
pub type DependencyList = Vec<DependencyRecord>;

/// Sort a dependency list by (id, version), then by stacks so per-stack records of one
/// version keep a fixed order
pub fn sort_dependencies(deps: &mut [DependencyRecord]) {
  deps.sort_by(|a, b| {
    a.id
      .cmp(&b.id)
      .then_with(|| compare_versions(&a.version, &b.version))
      .then_with(|| a.stacks.cmp(&b.stacks))
  });
}

/// Deprecation metadata for one version line of a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationEntry {
  pub version_line: String,
  pub name: String,
  pub date: String,
  pub link: String,
  /// Stored under the `match` key
  pub match_pattern: Option<String>,
}

impl DeprecationEntry {
  /// Key the deprecation list is de-duplicated and sorted by
  pub fn key(&self) -> (&str, &str) {
    (&self.name, &self.version_line)
  }
}

/// Lenient semver parse: "14.3" becomes 14.3.0, "1.2.3-rc1" keeps its pre-release
fn lenient_version(version: &str) -> Option<semver::Version> {
  let version = version.strip_prefix('v').unwrap_or(version);
  let split_at = version.find(['-', '+']).unwrap_or(version.len());
  let (core, suffix) = version.split_at(split_at);

  let parts: Vec<&str> = core.split('.').collect();
  if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
    return None;
  }

  let mut normalized = parts.join(".");
  for _ in parts.len()..3 {
    normalized.push_str(".0");
  }
  normalized.push_str(suffix);

  semver::Version::parse(&normalized).ok()
}

/// Compare two dependency versions
///
/// Parseable versions order semantically; unparseable versions sort after them by text.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
  match (lenient_version(a), lenient_version(b)) {
    (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => a.cmp(b),
  }
}

/// Sort and de-duplicate a list of version strings
pub fn sort_versions(versions: &mut Vec<String>) {
  versions.sort_by(|a, b| compare_versions(a, b));
  versions.dedup();
}

#[cfg(test)]
pub(crate) fn record(id: &str, version: &str, stacks: &[&str]) -> DependencyRecord {
  DependencyRecord {
    id: id.to_string(),
    name: None,
    version: version.to_string(),
    uri: format!("https://buildpacks.example/{}-{}.tgz", id, version),
    sha256: format!("sha-{}-{}", id, version),
    stacks: stacks.iter().map(|s| s.to_string()).collect(),
    source: Some(SourceReference {
      kind: SourceKind::Source,
      url: format!("https://upstream.example/{}-{}.tar.gz", id, version),
    }),
    source_sha256: String::new(),
    extra: toml_edit::Table::new(),
  }
}
