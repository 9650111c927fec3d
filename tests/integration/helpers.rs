//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const BIONIC: &str = "io.buildpacks.stacks.bionic";
pub const CFLINUXFS3: &str = "org.cloudfoundry.stacks.cflinuxfs3";

/// Policy variables that must not leak in from the environment running the tests
const POLICY_VARS: &[&str] = &[
  "REMOVAL_STRATEGY",
  "VERSION_LINE_TYPE",
  "VERSION_LINE",
  "DEPRECATION_DATE",
  "DEPRECATION_LINK",
  "DEPRECATION_MATCH",
];

/// Node manifest with 12.16.3 and 14.2.0 on bionic and cflinuxfs3
pub const NODE_MANIFEST: &str = r#"api = "0.2"

[buildpack]
id = "org.cloudfoundry.node-engine"
name = "Node Engine Buildpack"

[metadata]
include_files = ["bin/build", "bin/detect", "buildpack.toml"]
pre_package = "./scripts/build.sh"

[[metadata.dependencies]]
id = "node"
name = "Node Engine"
sha256 = "aaa"
source = "https://nodejs.org/dist/v12.16.3/node-v12.16.3.tar.gz"
source_sha256 = "bbb"
stacks = ["io.buildpacks.stacks.bionic", "org.cloudfoundry.stacks.cflinuxfs3"]
uri = "https://buildpacks.cloudfoundry.org/dependencies/node/node-12.16.3.tgz"
version = "12.16.3"

[[metadata.dependencies]]
id = "node"
name = "Node Engine"
sha256 = "ccc"
source = "https://nodejs.org/dist/v14.2.0/node-v14.2.0.tar.gz"
source_sha256 = "ddd"
stacks = ["io.buildpacks.stacks.bionic", "org.cloudfoundry.stacks.cflinuxfs3"]
uri = "https://buildpacks.cloudfoundry.org/dependencies/node/node-14.2.0.tgz"
version = "14.2.0"

[[order]]

  [[order.group]]
  id = "org.cloudfoundry.node-engine"
  version = "0.0.1"
"#;

/// A pipeline working directory: buildpack checkout, resource metadata and build results
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a workspace whose buildpack repository holds `manifest`
  pub fn new(manifest: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    let buildpack = path.join("buildpack");
    std::fs::create_dir_all(buildpack.join("bin"))?;
    std::fs::write(buildpack.join("buildpack.toml"), manifest)?;
    std::fs::write(buildpack.join("bin").join("build"), "#!/usr/bin/env bash\n")?;

    // Initialize git repo with main as default branch
    git(&buildpack, &["init", "--initial-branch=main"])?;
    git(&buildpack, &["config", "user.name", "Test User"])?;
    git(&buildpack, &["config", "user.email", "test@example.com"])?;
    git(&buildpack, &["add", "."])?;
    git(&buildpack, &["commit", "-m", "Initial buildpack"])?;

    Ok(Self { _root: root, path })
  }

  /// Write `source/data.json` naming the dependency and version of the run
  pub fn set_source(&self, name: &str, version: &str) -> Result<()> {
    let source = self.path.join("source");
    std::fs::create_dir_all(&source)?;
    std::fs::write(
      source.join("data.json"),
      format!(
        r#"{{"source": {{"name": "{}", "type": "{}"}}, "version": {{"ref": "{}"}}}}"#,
        name, name, version
      ),
    )?;
    Ok(())
  }

  fn builds_dir(&self, name: &str) -> Result<PathBuf> {
    let dir = self.path.join("builds").join("binary-builds-new").join(name);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
  }

  /// Add a build result for one stack
  pub fn add_build(&self, name: &str, version: &str, stack: &str) -> Result<()> {
    let body = format!(
      r#"{{
  "version": "{v}",
  "url": "https://buildpacks.cloudfoundry.org/dependencies/{n}/{n}-{v}-{s}.tgz",
  "sha256": "sha256-{s}",
  "source": {{"url": "https://nodejs.org/dist/v{v}/node-v{v}.tar.gz", "sha256": "source-sha256"}}
}}"#,
      n = name,
      v = version,
      s = stack
    );
    self.add_raw_build(name, version, stack, &body)
  }

  /// Add a build result with an arbitrary body
  pub fn add_raw_build(&self, name: &str, version: &str, stack: &str, body: &str) -> Result<()> {
    let dir = self.builds_dir(name)?;
    std::fs::write(dir.join(format!("{}-{}.json", version, stack)), body)?;
    Ok(())
  }

  /// Record a tracker story for the version
  pub fn set_story(&self, name: &str, version: &str, story_id: u64) -> Result<()> {
    let dir = self.builds_dir(name)?;
    std::fs::write(
      dir.join(format!("{}.json", version)),
      format!(r#"{{"tracker_story_id": {}}}"#, story_id),
    )?;
    Ok(())
  }

  /// Write the last released manifest
  pub fn set_released(&self, manifest: &str) -> Result<()> {
    let dir = self.path.join("buildpack-latest-released");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("buildpack.toml"), manifest)?;
    Ok(())
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  /// Full message of the latest commit in a repository under the workspace
  pub fn last_commit_message(&self, repo: &str) -> Result<String> {
    let output = git(&self.path.join(repo), &["log", "-1", "--format=%B"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
  }

  /// Number of commits in a repository under the workspace
  pub fn commit_count(&self, repo: &str) -> Result<usize> {
    let output = git(&self.path.join(repo), &["rev-list", "--count", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().parse()?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run update-cnb-dependency without checking the exit status
pub fn run_update_raw(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_update-cnb-dependency");

  let mut cmd = Command::new(bin);
  cmd.current_dir(cwd).args(args);
  for var in POLICY_VARS {
    cmd.env_remove(var);
  }
  for (key, value) in envs {
    cmd.env(key, value);
  }

  cmd.output().context("Failed to run update-cnb-dependency")
}

/// Run update-cnb-dependency and require success
pub fn run_update(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let output = run_update_raw(cwd, args, envs)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "update-cnb-dependency failed: {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}
