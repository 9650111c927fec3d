use crate::core::error::{ConfigError, ResultExt, UpdateError, UpdateResult};
use crate::manifest::deprecation::{DeprecationInput, is_valid_date};
use crate::manifest::{RemovalStrategy, VersionLineType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Short stack name that expands to every configured stack
pub const ANY_STACK: &str = "any-stack";

/// Configuration for update-cnb-dependency
/// Searched in order: update-cnb.toml, .update-cnb.toml (unless --config is given)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
  #[serde(default)]
  pub paths: PathsConfig,
  #[serde(default)]
  pub git: GitConfig,
  /// Known stacks, in the order they are listed in commit messages
  #[serde(default = "default_stacks")]
  pub stacks: Vec<StackConfig>,
  /// Catalog overrides for dependency ids and display names
  #[serde(default)]
  pub dependencies: Vec<DependencyOverride>,
}

/// Input and output locations, relative to the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
  /// Checkout of the buildpack being updated
  #[serde(default = "default_buildpack_dir")]
  pub buildpack: PathBuf,
  /// Checkout of the last released buildpack (optional on disk)
  #[serde(default = "default_released_dir")]
  pub latest_released: PathBuf,
  /// Resource metadata naming the dependency and version
  #[serde(default = "default_source_data")]
  pub source_data: PathBuf,
  /// Root of the per-dependency build output
  #[serde(default = "default_builds_dir")]
  pub builds: PathBuf,
  /// Where the updated buildpack is written and committed
  #[serde(default = "default_artifacts_dir")]
  pub artifacts: PathBuf,
}

fn default_buildpack_dir() -> PathBuf {
  PathBuf::from("buildpack")
}

fn default_released_dir() -> PathBuf {
  PathBuf::from("buildpack-latest-released")
}

fn default_source_data() -> PathBuf {
  PathBuf::from("source/data.json")
}

fn default_builds_dir() -> PathBuf {
  PathBuf::from("builds/binary-builds-new")
}

fn default_artifacts_dir() -> PathBuf {
  PathBuf::from("artifacts")
}

impl Default for PathsConfig {
  fn default() -> Self {
    Self {
      buildpack: default_buildpack_dir(),
      latest_released: default_released_dir(),
      source_data: default_source_data(),
      builds: default_builds_dir(),
      artifacts: default_artifacts_dir(),
    }
  }
}

/// Commit identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
  #[serde(default = "default_git_user_name")]
  pub user_name: String,
  #[serde(default = "default_git_user_email")]
  pub user_email: String,
}

fn default_git_user_name() -> String {
  "CF Buildpacks Team CI Server".to_string()
}

fn default_git_user_email() -> String {
  "cf-buildpacks-eng@pivotal.io".to_string()
}

impl Default for GitConfig {
  fn default() -> Self {
    Self {
      user_name: default_git_user_name(),
      user_email: default_git_user_email(),
    }
  }
}

/// A stack known by its short build-file name
///
/// ```toml
/// [[stacks]]
/// name = "bionic"
/// id = "io.buildpacks.stacks.bionic"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
  pub name: String,
  pub id: String,
}

fn default_stacks() -> Vec<StackConfig> {
  [
    ("cflinuxfs2", "org.cloudfoundry.stacks.cflinuxfs2"),
    ("cflinuxfs3", "org.cloudfoundry.stacks.cflinuxfs3"),
    ("bionic", "io.buildpacks.stacks.bionic"),
  ]
  .into_iter()
  .map(|(name, id)| StackConfig {
    name: name.to_string(),
    id: id.to_string(),
  })
  .collect()
}

/// Override of the built-in dependency catalog for one manifest name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyOverride {
  /// Name the build pipeline uses (`source.name`)
  pub name: String,
  /// Manifest `id` to write instead of the name
  #[serde(default)]
  pub id: Option<String>,
  /// Human-readable manifest `name`
  #[serde(default)]
  pub display_name: Option<String>,
}

impl Default for UpdateConfig {
  fn default() -> Self {
    Self {
      paths: PathsConfig::default(),
      git: GitConfig::default(),
      stacks: default_stacks(),
      dependencies: Vec::new(),
    }
  }
}

impl UpdateConfig {
  /// Find config file in search order: update-cnb.toml, .update-cnb.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![path.join("update-cnb.toml"), path.join(".update-cnb.toml")];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config, falling back to defaults when no file is present
  ///
  /// An explicitly requested file must exist.
  pub fn load(work_dir: &Path, explicit: Option<&Path>) -> UpdateResult<Self> {
    let config_path = match explicit {
      Some(path) => {
        let path = work_dir.join(path);
        if !path.exists() {
          return Err(UpdateError::Config(ConfigError::NotFound { path }));
        }
        path
      }
      None => match Self::find_config_path(work_dir) {
        Some(path) => path,
        None => return Ok(Self::default()),
      },
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: UpdateConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  /// Validate stack table and commit identity
  pub fn validate(&self) -> UpdateResult<()> {
    if self.stacks.is_empty() {
      return Err(UpdateError::with_help(
        "At least one stack must be configured",
        "Add a [[stacks]] entry or remove the empty stacks list",
      ));
    }

    let mut seen = HashSet::new();
    for stack in &self.stacks {
      if stack.name == ANY_STACK {
        return Err(UpdateError::message(format!(
          "'{}' is reserved and cannot be used as a stack name",
          ANY_STACK
        )));
      }
      if stack.name.is_empty() || stack.id.is_empty() {
        return Err(UpdateError::Config(ConfigError::MissingField {
          field: "stacks.name / stacks.id".to_string(),
        }));
      }
      if !seen.insert(stack.name.as_str()) {
        return Err(UpdateError::message(format!("Stack '{}' is configured twice", stack.name)));
      }
    }

    if self.git.user_name.trim().is_empty() || self.git.user_email.trim().is_empty() {
      return Err(UpdateError::Config(ConfigError::MissingField {
        field: "git.user_name / git.user_email".to_string(),
      }));
    }

    Ok(())
  }

  /// Stack id for a short build-file stack name
  pub fn stack_id(&self, name: &str) -> Option<&str> {
    self.stacks.iter().find(|s| s.name == name).map(|s| s.id.as_str())
  }

  /// Every configured stack id
  pub fn all_stack_ids(&self) -> Vec<String> {
    self.stacks.iter().map(|s| s.id.clone()).collect()
  }
}

/// Operator-selected reconciliation policy for one run
#[derive(Debug, Clone, Default)]
pub struct Policy {
  pub line_type: VersionLineType,
  pub removal_strategy: RemovalStrategy,
  pub deprecation: DeprecationInput,
}

impl Policy {
  /// Validate deprecation inputs
  pub fn validate(&self) -> UpdateResult<()> {
    let deprecation = &self.deprecation;
    if let Some(date) = deprecation.date.as_deref().filter(|d| !d.trim().is_empty())
      && !is_valid_date(date.trim())
    {
      return Err(UpdateError::Config(ConfigError::InvalidValue {
        field: "DEPRECATION_DATE".to_string(),
        reason: format!("'{}' is not YYYY-MM-DD or an RFC 3339 timestamp", date),
      }));
    }

    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if has(&deprecation.date) && has(&deprecation.link) && !has(&deprecation.version_line) {
      return Err(UpdateError::Config(ConfigError::MissingField {
        field: "VERSION_LINE".to_string(),
      }));
    }

    Ok(())
  }
}
