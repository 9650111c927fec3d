//! Update orchestration
//!
//! A run reconciles every per-stack build of one dependency version into the buildpack
//! manifest. Planning is pure with respect to the output: the buildpack is copied to the
//! artifacts directory, the manifest written and committed only once every stack build
//! has been reconciled.
//!
//! - **summary**: the fold accumulator and commit message

pub mod summary;

pub use summary::{SkipReason, UpdateSummary};

use crate::build::catalog::{Catalog, resolve_source};
use crate::build::{BuildRecord, SourceData, StackBuildFile, StackTarget, discover_stack_builds, tracker_story_id};
use crate::core::config::{GitConfig, PathsConfig, Policy, UpdateConfig};
use crate::core::error::{ReconcileError, ResultExt, UpdateError, UpdateResult};
use crate::core::vcs::{CommitSink, SystemGit};
use crate::manifest::{
  BuildpackManifest, DependencyRecord, Reconciliation, load_released, merge_deprecation, reconcile,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manifest file name inside a buildpack checkout
pub const MANIFEST_FILE: &str = "buildpack.toml";

/// Input and output locations of one run, resolved against the working directory
#[derive(Debug, Clone)]
pub struct UpdatePaths {
  pub buildpack: PathBuf,
  pub latest_released: PathBuf,
  pub source_data: PathBuf,
  pub builds: PathBuf,
  pub artifacts: PathBuf,
}

impl UpdatePaths {
  pub fn resolve(work_dir: &Path, paths: &PathsConfig) -> Self {
    Self {
      buildpack: work_dir.join(&paths.buildpack),
      latest_released: work_dir.join(&paths.latest_released),
      source_data: work_dir.join(&paths.source_data),
      builds: work_dir.join(&paths.builds),
      artifacts: work_dir.join(&paths.artifacts),
    }
  }
}

/// What happened to one stack build
#[derive(Debug)]
pub enum StackOutcome {
  /// Reconciled into the dependency list
  Applied {
    stacks: Vec<String>,
    reconciliation: Reconciliation,
  },
  /// Left out of the run
  Skipped(SkipReason),
}

/// Everything computed for a run, before anything is written
#[derive(Debug)]
pub struct UpdatePlan {
  pub summary: UpdateSummary,
  pub manifest: BuildpackManifest,
  pub story_id: Option<String>,
}

impl UpdatePlan {
  /// Nothing new to add and nothing rebuilt
  pub fn is_noop(&self) -> bool {
    self.summary.is_noop()
  }

  pub fn commit_message(&self) -> String {
    self.summary.commit_message(self.story_id.as_deref())
  }
}

/// Result of a complete run
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum UpdateOutcome {
  /// Built version is not required by the buildpack
  Skipped { summary: UpdateSummary },
  /// Computed but not written
  DryRun { summary: UpdateSummary, message: String },
  /// Manifest written to the artifacts directory
  Committed {
    summary: UpdateSummary,
    message: String,
    commit: Option<String>,
  },
}

impl UpdateOutcome {
  pub fn summary(&self) -> &UpdateSummary {
    match self {
      UpdateOutcome::Skipped { summary }
      | UpdateOutcome::DryRun { summary, .. }
      | UpdateOutcome::Committed { summary, .. } => summary,
    }
  }
}

/// Plan, then write and commit unless the plan is a no-op or `dry_run` is set
pub fn run(config: &UpdateConfig, policy: &Policy, paths: &UpdatePaths, dry_run: bool) -> UpdateResult<UpdateOutcome> {
  let plan = plan_update(config, policy, paths)?;

  if plan.is_noop() {
    return Ok(UpdateOutcome::Skipped { summary: plan.summary });
  }

  let message = plan.commit_message();
  if dry_run {
    return Ok(UpdateOutcome::DryRun {
      summary: plan.summary,
      message,
    });
  }

  write_artifacts(&plan, paths)?;
  let git = open_artifacts_repo(&paths.artifacts, &config.git)?;
  let commit = commit_plan(&plan, &git)?;

  Ok(UpdateOutcome::Committed {
    summary: plan.summary,
    message,
    commit,
  })
}

/// Reconcile every stack build of the current dependency version
///
/// An invalid version on one stack build is reported and the remaining builds are still
/// reconciled; the run then fails as a whole. Conflicting stacks fail immediately.
pub fn plan_update(config: &UpdateConfig, policy: &Policy, paths: &UpdatePaths) -> UpdateResult<UpdatePlan> {
  let source = SourceData::load(&paths.source_data)?;
  let mut manifest = BuildpackManifest::load(&paths.buildpack.join(MANIFEST_FILE))?;
  let released = load_released(&paths.latest_released.join(MANIFEST_FILE));
  let story_id = tracker_story_id(&paths.builds, &source.name, &source.version);
  let builds = discover_stack_builds(&paths.builds, &source.name, &source.version)?;

  if !builds.is_empty()
    && let Some(entry) = policy.deprecation.entry_for(&source.name)
  {
    let dates = merge_deprecation(&manifest.deprecation_dates()?, Some(&entry));
    manifest.set_deprecation_dates(&dates)?;
  }

  let catalog = Catalog::new(&config.dependencies);
  let mut dependencies = manifest.dependencies()?;
  let mut summary = UpdateSummary::new(&source.name, &source.version);
  let mut failures: Vec<(String, ReconcileError)> = Vec::new();

  for build in &builds {
    let outcome = apply_stack_build(build, &source, config, &catalog, policy, &dependencies, &released);
    match outcome {
      Ok(StackOutcome::Applied { stacks, reconciliation }) => {
        summary = summary.absorb(&stacks, &reconciliation);
        dependencies = reconciliation.dependencies;
      }
      Ok(StackOutcome::Skipped(reason)) => {
        eprintln!(
          "⚠️  Skipping {} build of {} {}: {}",
          build.label(),
          source.name,
          source.version,
          reason
        );
        summary = summary.skip(build.label(), reason);
      }
      Err(UpdateError::Reconcile(err @ ReconcileError::InvalidVersionFormat { .. })) => {
        eprintln!("❌ {} build of {} {}: {}", build.label(), source.name, source.version, err);
        failures.push((build.label().to_string(), err));
      }
      Err(err) => return Err(err),
    }
  }

  if let Some((_, first)) = failures.first() {
    if failures.len() == 1 {
      return Err(UpdateError::Reconcile(first.clone()));
    }
    let failed: Vec<&str> = failures.iter().map(|(label, _)| label.as_str()).collect();
    return Err(UpdateError::with_help(
      format!("{} stack builds failed: {}", failures.len(), failed.join(", ")),
      "Nothing was written. Fix the version or VERSION_LINE_TYPE and rerun.",
    ));
  }

  manifest.set_dependencies(&dependencies)?;

  Ok(UpdatePlan {
    summary,
    manifest,
    story_id,
  })
}

/// Build the manifest record for one stack build and reconcile it
fn apply_stack_build(
  build: &StackBuildFile,
  source: &SourceData,
  config: &UpdateConfig,
  catalog: &Catalog<'_>,
  policy: &Policy,
  existing: &[DependencyRecord],
  released: &[DependencyRecord],
) -> UpdateResult<StackOutcome> {
  let stacks = match &build.target {
    StackTarget::Any => config.all_stack_ids(),
    StackTarget::Named(name) => match config.stack_id(name) {
      Some(id) => vec![id.to_string()],
      None => return Ok(StackOutcome::Skipped(SkipReason::UnknownStack)),
    },
  };

  let record = BuildRecord::load(&build.path)?;
  let Some((reference, source_sha256)) = resolve_source(&source.name, &record) else {
    return Ok(StackOutcome::Skipped(SkipReason::MissingSourceUrl));
  };

  let dependency = DependencyRecord {
    id: catalog.dependency_id(&source.name),
    name: catalog.display_name(&source.name),
    version: source.version.clone(),
    uri: record.url,
    sha256: record.sha256,
    stacks: stacks.clone(),
    source: Some(reference),
    source_sha256,
    extra: toml_edit::Table::new(),
  };

  let reconciliation = reconcile(
    &dependency,
    policy.line_type,
    policy.removal_strategy,
    existing,
    released,
  )?;

  Ok(StackOutcome::Applied { stacks, reconciliation })
}

/// Copy the buildpack into the artifacts directory and write the updated manifest there
pub fn write_artifacts(plan: &UpdatePlan, paths: &UpdatePaths) -> UpdateResult<PathBuf> {
  copy_dir(&paths.buildpack, &paths.artifacts)
    .with_context(|| format!("Could not copy buildpack to {}", paths.artifacts.display()))?;

  let manifest_path = paths.artifacts.join(MANIFEST_FILE);
  plan.manifest.save(&manifest_path)?;
  Ok(manifest_path)
}

/// Open the copied repository with the configured commit identity
pub fn open_artifacts_repo(artifacts: &Path, git: &GitConfig) -> UpdateResult<SystemGit> {
  let repo = SystemGit::open(artifacts)?;

  // A buildpack copied without its .git would commit into an enclosing repository
  let expected = fs::canonicalize(artifacts)?;
  let actual = fs::canonicalize(repo.work_tree()).unwrap_or_else(|_| repo.work_tree().to_path_buf());
  if actual != expected {
    return Err(UpdateError::with_help(
      format!("{} is not the root of a git repository", artifacts.display()),
      "The buildpack directory must be a git checkout; its .git is copied along with it.",
    ));
  }

  repo.set_config("user.name", &git.user_name)?;
  repo.set_config("user.email", &git.user_email)?;
  Ok(repo)
}

/// Commit the written manifest
pub fn commit_plan(plan: &UpdatePlan, sink: &dyn CommitSink) -> UpdateResult<Option<String>> {
  sink.commit(&[PathBuf::from(MANIFEST_FILE)], &plan.commit_message())
}

/// Recursive copy preserving the directory layout (including `.git`)
fn copy_dir(src: &Path, dst: &Path) -> UpdateResult<()> {
  for entry in WalkDir::new(src).follow_links(false) {
    let entry = entry?;
    let relative = entry.path().strip_prefix(src)?;
    let target = dst.join(relative);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target).with_context(|| format!("Failed to create {}", target.display()))?;
    } else if file_type.is_symlink() {
      copy_symlink(entry.path(), &target)?;
    } else {
      fs::copy(entry.path(), &target).with_context(|| format!("Failed to copy {}", entry.path().display()))?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> UpdateResult<()> {
  let link = fs::read_link(src)?;
  if dst.symlink_metadata().is_ok() {
    fs::remove_file(dst)?;
  }
  std::os::unix::fs::symlink(link, dst)?;
  Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> UpdateResult<()> {
  fs::copy(src, dst)?;
  Ok(())
}
