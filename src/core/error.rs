//! Error types for update-cnb-dependency with contextual messages and exit codes
//!
//! Every error is categorized so the process can exit with a meaningful code, and most
//! categories carry a hint that points the operator at the input that needs fixing.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for update-cnb-dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, I/O)
  System = 2,
  /// Manifest invariant violated during reconciliation
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for update-cnb-dependency
#[derive(Debug)]
pub enum UpdateError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Manifest reconciliation errors
  Reconcile(ReconcileError),

  /// Manifest document errors (buildpack.toml shape)
  Manifest { path: PathBuf, reason: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl UpdateError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    UpdateError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    UpdateError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      UpdateError::Message { message, context, help } => UpdateError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      UpdateError::Io(e) => UpdateError::Io(io::Error::new(e.kind(), format!("{}\n{}", e, ctx_str))),
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      UpdateError::Config(_) => ExitCode::User,
      UpdateError::Git(_) => ExitCode::System,
      UpdateError::Reconcile(ReconcileError::ConflictingStacks { .. }) => ExitCode::Validation,
      UpdateError::Reconcile(_) => ExitCode::User,
      UpdateError::Manifest { .. } => ExitCode::User,
      UpdateError::Io(_) => ExitCode::System,
      UpdateError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      UpdateError::Config(e) => e.help_message(),
      UpdateError::Git(e) => e.help_message(),
      UpdateError::Reconcile(e) => e.help_message(),
      UpdateError::Manifest { path, .. } => Some(format!(
        "Check that {} is a valid buildpack.toml with a [metadata] table.",
        path.display()
      )),
      UpdateError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for UpdateError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UpdateError::Config(e) => write!(f, "{}", e),
      UpdateError::Git(e) => write!(f, "{}", e),
      UpdateError::Reconcile(e) => write!(f, "{}", e),
      UpdateError::Manifest { path, reason } => write!(f, "Invalid manifest {}: {}", path.display(), reason),
      UpdateError::Io(e) => write!(f, "I/O error: {}", e),
      UpdateError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for UpdateError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      UpdateError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for UpdateError {
  fn from(err: io::Error) -> Self {
    UpdateError::Io(err)
  }
}

impl From<String> for UpdateError {
  fn from(msg: String) -> Self {
    UpdateError::message(msg)
  }
}

impl From<&str> for UpdateError {
  fn from(msg: &str) -> Self {
    UpdateError::message(msg)
  }
}

impl From<ReconcileError> for UpdateError {
  fn from(err: ReconcileError) -> Self {
    UpdateError::Reconcile(err)
  }
}

impl From<toml_edit::TomlError> for UpdateError {
  fn from(err: toml_edit::TomlError) -> Self {
    UpdateError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for UpdateError {
  fn from(err: toml_edit::de::Error) -> Self {
    UpdateError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for UpdateError {
  fn from(err: serde_json::Error) -> Self {
    UpdateError::message(format!("JSON error: {}", err))
  }
}

impl From<walkdir::Error> for UpdateError {
  fn from(err: walkdir::Error) -> Self {
    UpdateError::Io(err.into())
  }
}

impl From<std::path::StripPrefixError> for UpdateError {
  fn from(err: std::path::StripPrefixError) -> Self {
    UpdateError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Explicitly requested config file does not exist
  NotFound { path: PathBuf },

  /// A policy value could not be parsed or is inconsistent
  InvalidValue { field: String, reason: String },

  /// Missing required field
  MissingField { field: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Pass an existing file to --config or drop the flag to use the defaults.".to_string())
      }
      ConfigError::InvalidValue { field, .. } => Some(format!(
        "Check the value passed for `{}` (flag or environment variable).",
        field
      )),
      ConfigError::MissingField { field } => Some(format!("Set `{}` or remove the options that depend on it.", field)),
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => write!(f, "Config file not found: {}", path.display()),
      ConfigError::InvalidValue { field, reason } => write!(f, "Invalid value for {}: {}", field, reason),
      ConfigError::MissingField { field } => write!(f, "Missing required setting: {}", field),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "The buildpack directory must be a git checkout: {}",
        path.display()
      )),
      GitError::CommandFailed { stderr, .. } if stderr.contains("Please tell me who you are") => {
        Some("Set --git-user-name and --git-user-email (or the [git] config table).".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
    }
  }
}

/// Failures of the reconciliation core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
  /// Version has fewer numeric components than the line type needs
  InvalidVersionFormat { version: String, line_type: String },

  /// Two surviving records for one id+version serve the same stack
  ConflictingStacks {
    id: String,
    version: String,
    stacks: Vec<String>,
  },
}

impl ReconcileError {
  fn help_message(&self) -> Option<String> {
    match self {
      ReconcileError::InvalidVersionFormat { line_type, .. } => Some(format!(
        "Use a version with enough numeric components for a '{}' version line, or pick another VERSION_LINE_TYPE.",
        line_type
      )),
      ReconcileError::ConflictingStacks { .. } => {
        Some("The manifest already holds overlapping builds of this version; fix buildpack.toml by hand.".to_string())
      }
    }
  }
}

impl fmt::Display for ReconcileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReconcileError::InvalidVersionFormat { version, line_type } => {
        write!(f, "Invalid version format '{}' for version line type '{}'", version, line_type)
      }
      ReconcileError::ConflictingStacks { id, version, stacks } => write!(
        f,
        "Conflicting stacks for {} {}: more than one entry serves {}",
        id,
        version,
        stacks.join(", ")
      ),
    }
  }
}

impl std::error::Error for ReconcileError {}

/// Result type alias for update-cnb-dependency
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> UpdateResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> UpdateResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<UpdateError>,
{
  fn context(self, ctx: impl Into<String>) -> UpdateResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> UpdateResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &UpdateError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
