//! CLI commands for update-cnb-dependency
//!
//! - **update**: reconcile a new dependency build into buildpack.toml and commit it

pub mod update;

pub use update::{UpdateOptions, run_update};
