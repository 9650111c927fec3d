//! Version-line classification
//!
//! A version line groups versions that are mutually exclusive in a manifest: with a
//! `minor` line type, 14.3.0 and 14.3.1 are both on line "14.3" and only one of them
//! is kept when the removal strategy enforces line exclusivity.

use crate::core::error::ReconcileError;
use std::fmt;
use std::str::FromStr;

/// How versions are grouped into lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionLineType {
  /// Every version is independent
  #[default]
  None,
  /// Group by the first numeric component
  Major,
  /// Group by the first two numeric components
  Minor,
}

impl VersionLineType {
  /// Number of leading numeric components that make up the line key
  fn components(self) -> usize {
    match self {
      VersionLineType::None => 0,
      VersionLineType::Major => 1,
      VersionLineType::Minor => 2,
    }
  }
}

impl fmt::Display for VersionLineType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      VersionLineType::None => "none",
      VersionLineType::Major => "major",
      VersionLineType::Minor => "minor",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for VersionLineType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "" | "none" | "null" | "nil" => Ok(VersionLineType::None),
      "major" => Ok(VersionLineType::Major),
      "minor" => Ok(VersionLineType::Minor),
      other => Err(format!(
        "unknown version line type '{}' (expected none, major or minor)",
        other
      )),
    }
  }
}

/// Version-line key of a version; `None` means the version is on no line
pub type VersionLine = Option<String>;

/// Compute the version line of `version` under `line_type`
pub fn classify(version: &str, line_type: VersionLineType) -> Result<VersionLine, ReconcileError> {
  let wanted = line_type.components();
  if wanted == 0 {
    return Ok(None);
  }

  let invalid = || ReconcileError::InvalidVersionFormat {
    version: version.to_string(),
    line_type: line_type.to_string(),
  };

  let mut segments = version.split('.');
  let mut numbers = Vec::with_capacity(wanted);
  for _ in 0..wanted {
    let segment = segments.next().ok_or_else(invalid)?;
    let digits: &str = &segment[..segment.find(|c: char| !c.is_ascii_digit()).unwrap_or(segment.len())];
    if digits.is_empty() {
      return Err(invalid());
    }
    numbers.push(digits);
  }

  Ok(Some(numbers.join(".")))
}
