//! Deprecation-date bookkeeping

use super::model::DeprecationEntry;
use chrono::{DateTime, NaiveDate};

/// Merge `new_entry` into `existing`, replacing any entry with the same (name, version line)
///
/// The result is sorted by (name, version line). Without a new entry the list is returned
/// unchanged.
pub fn merge_deprecation(existing: &[DeprecationEntry], new_entry: Option<&DeprecationEntry>) -> Vec<DeprecationEntry> {
  let Some(new_entry) = new_entry else {
    return existing.to_vec();
  };

  let mut merged: Vec<DeprecationEntry> = existing
    .iter()
    .filter(|d| d.key() != new_entry.key())
    .cloned()
    .collect();
  merged.push(new_entry.clone());
  merged.sort_by(|a, b| a.key().cmp(&b.key()));
  merged
}

/// Operator-supplied deprecation inputs for one run
#[derive(Debug, Clone, Default)]
pub struct DeprecationInput {
  pub version_line: Option<String>,
  pub date: Option<String>,
  pub link: Option<String>,
  pub match_pattern: Option<String>,
}

impl DeprecationInput {
  /// Build the entry for `manifest_name`, if the inputs describe one
  ///
  /// An entry needs a date, a link and a version line other than `latest`.
  pub fn entry_for(&self, manifest_name: &str) -> Option<DeprecationEntry> {
    let date = non_empty(self.date.as_deref())?;
    let link = non_empty(self.link.as_deref())?;
    let version_line = non_empty(self.version_line.as_deref())?.to_lowercase();
    if version_line == "latest" {
      return None;
    }

    let match_pattern = non_empty(self.match_pattern.as_deref())
      .filter(|m| !m.eq_ignore_ascii_case("null"))
      .map(str::to_string);

    Some(DeprecationEntry {
      version_line,
      name: manifest_name.to_string(),
      date: date.to_string(),
      link: link.to_string(),
      match_pattern,
    })
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn is_valid_date(date: &str) -> bool {
  NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(date).is_ok()
}
