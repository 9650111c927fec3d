//! buildpack.toml reading and writing
//!
//! Uses `toml_edit` so everything outside the two tables this tool rewrites
//! (`metadata.dependencies` and `metadata.dependency_deprecation_dates`) keeps its
//! comments and formatting.

use super::model::{DependencyList, DependencyRecord, DeprecationEntry, SourceKind, SourceReference};
use crate::core::error::{ResultExt, UpdateError, UpdateResult};
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{Array, ArrayOfTables, DocumentMut, Item, Table, value};

const DEPENDENCIES: &str = "dependencies";
const DEPRECATION_DATES: &str = "dependency_deprecation_dates";

/// Keys of a dependency entry that map onto `DependencyRecord` fields
const MODELLED_KEYS: &[&str] = &[
  "id",
  "name",
  "version",
  "uri",
  "sha256",
  "stacks",
  "source",
  "osl",
  "source_sha256",
];

/// A parsed buildpack.toml
#[derive(Debug)]
pub struct BuildpackManifest {
  path: PathBuf,
  doc: DocumentMut,
}

impl BuildpackManifest {
  /// Load a manifest from disk
  pub fn load(path: &Path) -> UpdateResult<Self> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(path, &content)
  }

  /// Parse manifest content; `path` is only used in error messages
  pub fn parse(path: &Path, content: &str) -> UpdateResult<Self> {
    let doc: DocumentMut = content
      .parse()
      .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Self {
      path: path.to_path_buf(),
      doc,
    })
  }

  /// Entries of `metadata.dependencies`
  pub fn dependencies(&self) -> UpdateResult<DependencyList> {
    self
      .metadata_tables(DEPENDENCIES)?
      .iter()
      .map(|t| self.parse_dependency(t))
      .collect()
  }

  /// Replace `metadata.dependencies`
  pub fn set_dependencies(&mut self, deps: &[DependencyRecord]) -> UpdateResult<()> {
    let mut tables = ArrayOfTables::new();
    for dep in deps {
      tables.push(dependency_table(dep));
    }
    self.metadata_mut()?.insert(DEPENDENCIES, Item::ArrayOfTables(tables));
    Ok(())
  }

  /// Entries of `metadata.dependency_deprecation_dates`
  pub fn deprecation_dates(&self) -> UpdateResult<Vec<DeprecationEntry>> {
    self
      .metadata_tables(DEPRECATION_DATES)?
      .iter()
      .map(|t| self.parse_deprecation(t))
      .collect()
  }

  /// Replace `metadata.dependency_deprecation_dates`
  pub fn set_deprecation_dates(&mut self, entries: &[DeprecationEntry]) -> UpdateResult<()> {
    let mut tables = ArrayOfTables::new();
    for entry in entries {
      tables.push(deprecation_table(entry));
    }
    self.metadata_mut()?.insert(DEPRECATION_DATES, Item::ArrayOfTables(tables));
    Ok(())
  }

  /// Serialized document
  pub fn render(&self) -> String {
    self.doc.to_string()
  }

  /// Write the document to `path` in one call
  pub fn save(&self, path: &Path) -> UpdateResult<()> {
    fs::write(path, self.render()).with_context(|| format!("Failed to write {}", path.display()))
  }

  fn invalid(&self, reason: impl Into<String>) -> UpdateError {
    UpdateError::Manifest {
      path: self.path.clone(),
      reason: reason.into(),
    }
  }

  /// Tables under `metadata.<key>`, accepting both `[[...]]` and inline arrays
  fn metadata_tables(&self, key: &str) -> UpdateResult<Vec<Table>> {
    let Some(metadata) = self.doc.get("metadata") else {
      return Ok(Vec::new());
    };
    let metadata = metadata
      .as_table_like()
      .ok_or_else(|| self.invalid("`metadata` is not a table"))?;

    match metadata.get(key) {
      None => Ok(Vec::new()),
      Some(Item::ArrayOfTables(tables)) => Ok(tables.iter().cloned().collect()),
      Some(Item::Value(toml_edit::Value::Array(array))) => array
        .iter()
        .map(|v| {
          v.as_inline_table()
            .map(|t| t.clone().into_table())
            .ok_or_else(|| self.invalid(format!("`metadata.{}` must contain tables", key)))
        })
        .collect(),
      Some(_) => Err(self.invalid(format!("`metadata.{}` must be an array of tables", key))),
    }
  }

  fn metadata_mut(&mut self) -> UpdateResult<&mut Table> {
    let path = self.path.clone();
    self
      .doc
      .entry("metadata")
      .or_insert(toml_edit::table())
      .as_table_mut()
      .ok_or(UpdateError::Manifest {
        path,
        reason: "`metadata` is not a standard table".to_string(),
      })
  }

  fn parse_dependency(&self, table: &Table) -> UpdateResult<DependencyRecord> {
    let required = |key: &str| {
      str_field(table, key).ok_or_else(|| self.invalid(format!("dependency entry is missing `{}`", key)))
    };

    let id = required("id")?;
    let version = required("version")?;

    let stacks = match table.get("stacks") {
      None => Vec::new(),
      Some(item) => item
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .ok_or_else(|| self.invalid(format!("`stacks` of {} {} must be an array", id, version)))?,
    };

    let source = [SourceKind::Source, SourceKind::Osl]
      .into_iter()
      .find_map(|kind| str_field(table, kind.key()).map(|url| SourceReference { kind, url }));

    let mut extra = Table::new();
    for (key, item) in table.iter() {
      if !MODELLED_KEYS.contains(&key) {
        extra.insert(key, item.clone());
      }
    }

    Ok(DependencyRecord {
      name: str_field(table, "name"),
      uri: str_field(table, "uri").unwrap_or_default(),
      sha256: str_field(table, "sha256").unwrap_or_default(),
      source_sha256: str_field(table, "source_sha256").unwrap_or_default(),
      id,
      version,
      stacks,
      source,
      extra,
    })
  }

  fn parse_deprecation(&self, table: &Table) -> UpdateResult<DeprecationEntry> {
    let required = |key: &str| {
      str_field(table, key).ok_or_else(|| self.invalid(format!("deprecation entry is missing `{}`", key)))
    };

    // Dates are usually TOML datetimes, but older manifests store strings
    let date = match table.get("date").and_then(Item::as_value) {
      Some(toml_edit::Value::Datetime(dt)) => dt.value().to_string(),
      Some(toml_edit::Value::String(s)) => s.value().clone(),
      _ => return Err(self.invalid("deprecation entry is missing `date`")),
    };

    Ok(DeprecationEntry {
      version_line: required("version_line")?,
      name: required("name")?,
      link: required("link")?,
      match_pattern: str_field(table, "match"),
      date,
    })
  }
}

fn str_field(table: &Table, key: &str) -> Option<String> {
  table.get(key).and_then(Item::as_str).map(str::to_string)
}

fn dependency_table(dep: &DependencyRecord) -> Table {
  let mut table = Table::new();
  table.insert("id", value(dep.id.as_str()));
  if let Some(name) = &dep.name {
    table.insert("name", value(name.as_str()));
  }
  table.insert("version", value(dep.version.as_str()));
  table.insert("uri", value(dep.uri.as_str()));
  table.insert("sha256", value(dep.sha256.as_str()));
  table.insert("stacks", value(dep.stacks.iter().map(String::as_str).collect::<Array>()));
  if let Some(source) = &dep.source {
    table.insert(source.kind.key(), value(source.url.as_str()));
  }
  table.insert("source_sha256", value(dep.source_sha256.as_str()));
  for (key, item) in dep.extra.iter() {
    table.insert(key, item.clone());
  }
  table
}

fn deprecation_table(entry: &DeprecationEntry) -> Table {
  let mut table = Table::new();
  table.insert("version_line", value(entry.version_line.as_str()));
  table.insert("name", value(entry.name.as_str()));
  match entry.date.parse::<toml_edit::Datetime>() {
    Ok(dt) => table.insert("date", value(dt)),
    Err(_) => table.insert("date", value(entry.date.as_str())),
  };
  table.insert("link", value(entry.link.as_str()));
  if let Some(pattern) = &entry.match_pattern {
    table.insert("match", value(pattern.as_str()));
  }
  table
}

/// Dependencies of the last released manifest
///
/// A missing or unreadable release is treated as an empty list.
pub fn load_released(path: &Path) -> DependencyList {
  if !path.exists() {
    return Vec::new();
  }

  match BuildpackManifest::load(path).and_then(|m| m.dependencies()) {
    Ok(deps) => deps,
    Err(e) => {
      eprintln!("⚠️  Ignoring latest released manifest {}: {}", path.display(), e);
      Vec::new()
    }
  }
}
