mod build;
mod commands;
mod core;
mod manifest;
mod update;

use clap::Parser;
use crate::core::config::Policy;
use crate::core::error::{UpdateError, print_error};
use crate::manifest::{DeprecationInput, RemovalStrategy, VersionLineType};
use std::path::PathBuf;

/// Reconcile a freshly built dependency into a buildpack's buildpack.toml and commit it
///
/// Reads the buildpack checkout, the last released buildpack, the resource metadata and
/// the per-stack build results from the working directory, then writes and commits the
/// updated manifest in the artifacts directory.
#[derive(Parser)]
#[command(name = "update-cnb-dependency")]
#[command(version, about, long_about)]
#[command(styles = get_styles())]
struct Cli {
  /// How versions are grouped into lines: none, major or minor
  #[arg(long, env = "VERSION_LINE_TYPE", default_value_t = VersionLineType::None)]
  version_line_type: VersionLineType,

  /// Which older versions on the new version's line are removed: none, line or released-only
  #[arg(long, env = "REMOVAL_STRATEGY", default_value_t = RemovalStrategy::None)]
  removal_strategy: RemovalStrategy,

  /// Version line the deprecation date applies to (e.g. 14.x.x, or latest)
  #[arg(long, env = "VERSION_LINE")]
  version_line: Option<String>,

  /// End-of-life date of the version line (YYYY-MM-DD)
  #[arg(long, env = "DEPRECATION_DATE")]
  deprecation_date: Option<String>,

  /// Link documenting the end-of-life date
  #[arg(long, env = "DEPRECATION_LINK")]
  deprecation_link: Option<String>,

  /// Pattern of versions covered by the deprecation entry
  #[arg(long, env = "DEPRECATION_MATCH")]
  deprecation_match: Option<String>,

  /// Config file (default: update-cnb.toml or .update-cnb.toml in the working directory)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Directory holding the pipeline inputs and outputs (default: current directory)
  #[arg(long)]
  work_dir: Option<PathBuf>,

  /// Override the commit author name
  #[arg(long)]
  git_user_name: Option<String>,

  /// Override the commit author email
  #[arg(long)]
  git_user_email: Option<String>,

  /// Compute the update and print the commit message without writing anything
  #[arg(long)]
  dry_run: bool,

  /// Output the run summary in JSON format
  #[arg(long)]
  json: bool,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();

  let work_dir = match cli.work_dir {
    Some(dir) => dir,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => {
        eprintln!("Error: Failed to get current directory: {}", e);
        std::process::exit(1);
      }
    },
  };

  let policy = Policy {
    line_type: cli.version_line_type,
    removal_strategy: cli.removal_strategy,
    deprecation: DeprecationInput {
      version_line: cli.version_line,
      date: cli.deprecation_date,
      link: cli.deprecation_link,
      match_pattern: cli.deprecation_match,
    },
  };

  let result = commands::run_update(commands::UpdateOptions {
    work_dir,
    config: cli.config,
    policy,
    git_user_name: cli.git_user_name,
    git_user_email: cli.git_user_email,
    dry_run: cli.dry_run,
    json: cli.json,
  });

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: UpdateError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
