use std::path::PathBuf;

use crate::core::config::{Policy, UpdateConfig};
use crate::core::error::{UpdateError, UpdateResult};
use crate::update::{self, UpdateOutcome, UpdatePaths};

/// Options of one `update-cnb-dependency` invocation
pub struct UpdateOptions {
  pub work_dir: PathBuf,
  pub config: Option<PathBuf>,
  pub policy: Policy,
  pub git_user_name: Option<String>,
  pub git_user_email: Option<String>,
  pub dry_run: bool,
  pub json: bool,
}

/// Run the update
pub fn run_update(options: UpdateOptions) -> UpdateResult<()> {
  let mut config = UpdateConfig::load(&options.work_dir, options.config.as_deref())?;
  if let Some(name) = options.git_user_name {
    config.git.user_name = name;
  }
  if let Some(email) = options.git_user_email {
    config.git.user_email = email;
  }
  config.validate()?;
  options.policy.validate()?;

  let paths = UpdatePaths::resolve(&options.work_dir, &config.paths);

  if !options.json {
    println!(
      "🔄 Reconciling dependency build (version line: {}, removal: {})",
      options.policy.line_type, options.policy.removal_strategy
    );
  }

  let outcome = update::run(&config, &options.policy, &paths, options.dry_run)?;

  if options.json {
    println!(
      "{}",
      serde_json::to_string_pretty(&outcome)
        .map_err(|e| UpdateError::message(format!("Serialization error: {}", e)))?
    );
    return Ok(());
  }

  print_outcome(&outcome, &paths);
  Ok(())
}

fn print_outcome(outcome: &UpdateOutcome, paths: &UpdatePaths) {
  let summary = outcome.summary();

  println!("📦 {} {}", summary.dependency, summary.version);
  if !summary.added.is_empty() {
    println!("   ➕ added:   {}", summary.added.join(", "));
  }
  if !summary.removed.is_empty() {
    println!("   ➖ removed: {}", summary.removed.join(", "));
  }
  if !summary.skipped.is_empty() {
    let skipped: Vec<String> = summary
      .skipped
      .iter()
      .map(|s| format!("{} ({})", s.stack, s.reason))
      .collect();
    println!("   ⏭️  skipped: {}", skipped.join(", "));
  }

  if summary.rebuilt() {
    println!("REBUILD: skipping most version updating logic");
  }

  match outcome {
    UpdateOutcome::Skipped { .. } => {
      println!("SKIP: Built version is not required by buildpack.");
    }
    UpdateOutcome::DryRun { message, .. } => {
      println!("\n📋 Dry run, nothing written. Commit message would be:\n");
      println!("{}", message);
    }
    UpdateOutcome::Committed { message, commit, .. } => {
      println!("\n{}\n", message);
      match commit {
        Some(sha) => println!(
          "✅ Committed {} in {}",
          &sha[..sha.len().min(7)],
          paths.artifacts.display()
        ),
        None => println!("✅ Manifest already up to date in {}", paths.artifacts.display()),
      }
    }
  }
}
