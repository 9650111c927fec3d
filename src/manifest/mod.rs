//! Buildpack manifest bookkeeping
//!
//! - **model**: dependency records, deprecation entries, version ordering
//! - **version_line**: version-line classification (`none`, `major`, `minor`)
//! - **reconcile**: the dependency-list reconciliation rules
//! - **deprecation**: deprecation-date merge
//! - **document**: lossless buildpack.toml I/O

pub mod deprecation;
pub mod document;
pub mod model;
pub mod reconcile;
pub mod version_line;

pub use deprecation::{DeprecationInput, merge_deprecation};
pub use document::{BuildpackManifest, load_released};
pub use model::{DependencyList, DependencyRecord, DeprecationEntry, SourceKind, SourceReference};
pub use reconcile::{Reconciliation, RemovalStrategy, reconcile};
pub use version_line::VersionLineType;
