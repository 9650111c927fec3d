//! Core building blocks shared by every part of the tool
//!
//! - **config**: optional update-cnb.toml and the per-run policy
//! - **error**: error types with contextual help messages and exit codes
//! - **vcs**: git operations abstraction (SystemGit)

pub mod config;
pub mod error;
pub mod vcs;
