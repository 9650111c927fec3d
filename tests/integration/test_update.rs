//! End-to-end runs of update-cnb-dependency against a pipeline working directory

use crate::helpers::*;
use anyhow::Result;

const MAJOR_LINE: &[(&str, &str)] = &[("VERSION_LINE_TYPE", "major"), ("REMOVAL_STRATEGY", "line")];

#[test]
fn test_adds_version_and_commits_to_artifacts() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "bionic")?;
  workspace.add_build("node", "14.3.0", "cflinuxfs3")?;

  let output = run_update(&workspace.path, &[], MAJOR_LINE)?;
  assert!(stdout(&output).contains("✅ Committed"));

  let manifest = workspace.read_file("artifacts/buildpack.toml")?;
  assert!(manifest.contains(r#"version = "14.3.0""#));
  assert!(manifest.contains(r#"version = "12.16.3""#));
  assert!(!manifest.contains(r#"version = "14.2.0""#));
  assert!(manifest.contains("sha256-bionic"));
  assert!(manifest.contains("sha256-cflinuxfs3"));
  // Unrelated tables survive the rewrite
  assert!(manifest.contains("pre_package"));
  assert!(manifest.contains("[[order]]"));

  assert_eq!(
    workspace.last_commit_message("artifacts")?,
    format!(
      "Add node 14.3.0, remove node 14.2.0\n\nfor stack(s) {}, {}",
      BIONIC, CFLINUXFS3
    )
  );
  assert_eq!(workspace.commit_count("artifacts")?, 2);

  // The input checkout is left alone
  assert_eq!(workspace.read_file("buildpack/buildpack.toml")?, NODE_MANIFEST);
  assert_eq!(workspace.commit_count("buildpack")?, 1);
  assert!(workspace.file_exists("artifacts/bin/build"));

  Ok(())
}

#[test]
fn test_default_policy_keeps_older_versions() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "bionic")?;

  run_update(&workspace.path, &[], &[])?;

  let manifest = workspace.read_file("artifacts/buildpack.toml")?;
  assert!(manifest.contains(r#"version = "14.2.0""#));
  assert!(manifest.contains(r#"version = "14.3.0""#));
  assert_eq!(
    workspace.last_commit_message("artifacts")?,
    format!("Add node 14.3.0\n\nfor stack(s) {}", BIONIC)
  );

  Ok(())
}

#[test]
fn test_rebuild_of_existing_version() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.2.0")?;
  workspace.add_build("node", "14.2.0", "bionic")?;

  let output = run_update(&workspace.path, &[], MAJOR_LINE)?;
  assert!(stdout(&output).contains("REBUILD: skipping most version updating logic"));

  let message = workspace.last_commit_message("artifacts")?;
  assert!(message.starts_with("Rebuild node 14.2.0"));
  assert!(!message.contains("remove"));

  let manifest = workspace.read_file("artifacts/buildpack.toml")?;
  assert!(manifest.contains("sha256-bionic"));
  // cflinuxfs3 was not rebuilt and keeps its 14.2.0 build
  assert!(manifest.contains(r#"sha256 = "ccc""#));

  Ok(())
}

#[test]
fn test_rebuild_of_shared_entry_under_default_policy() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.2.0")?;
  workspace.add_build("node", "14.2.0", "bionic")?;

  let output = run_update(&workspace.path, &[], &[])?;
  assert!(stdout(&output).contains("REBUILD: skipping most version updating logic"));
  assert_eq!(
    workspace.last_commit_message("artifacts")?,
    format!("Rebuild node 14.2.0\n\nfor stack(s) {}", BIONIC)
  );

  let manifest = workspace.read_file("artifacts/buildpack.toml")?;
  assert_eq!(manifest.matches(r#"version = "14.2.0""#).count(), 2);
  assert!(manifest.contains("sha256-bionic"));
  assert!(manifest.contains(r#"sha256 = "ccc""#));
  assert!(manifest.contains(r#"version = "12.16.3""#));

  // Rebuilding again on top of the split entries keeps the same shape
  std::fs::write(workspace.path.join("buildpack/buildpack.toml"), &manifest)?;
  std::fs::remove_dir_all(workspace.path.join("artifacts"))?;
  run_update(&workspace.path, &["--removal-strategy", "released-only"], &[])?;

  let again = workspace.read_file("artifacts/buildpack.toml")?;
  assert_eq!(again.matches(r#"version = "14.2.0""#).count(), 2);
  assert_eq!(again.matches("sha256-bionic").count(), 1);
  assert_eq!(again.matches(r#"sha256 = "ccc""#).count(), 1);
  assert!(workspace.last_commit_message("artifacts")?.starts_with("Rebuild node 14.2.0"));

  Ok(())
}

#[test]
fn test_skip_when_no_build_applies() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_raw_build(
    "node",
    "14.3.0",
    "bionic",
    r#"{"version": "14.3.0", "url": "https://example.com/node.tgz", "sha256": "abc"}"#,
  )?;
  workspace.add_build("node", "14.3.0", "windows")?;

  let output = run_update(&workspace.path, &[], MAJOR_LINE)?;

  assert!(stdout(&output).contains("SKIP: Built version is not required by buildpack."));
  assert!(!workspace.file_exists("artifacts"));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Skipping bionic build"));
  assert!(stderr.contains("Skipping windows build"));

  Ok(())
}

#[test]
fn test_invalid_version_aborts_without_writing() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "15")?;
  workspace.add_build("node", "15", "bionic")?;

  let output = run_update_raw(
    &workspace.path,
    &[],
    &[("VERSION_LINE_TYPE", "minor"), ("REMOVAL_STRATEGY", "line")],
  )?;

  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Invalid version format '15'"));
  assert!(!workspace.file_exists("artifacts"));

  Ok(())
}

#[test]
fn test_unknown_policy_value_is_rejected() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;

  let output = run_update_raw(&workspace.path, &[], &[("REMOVAL_STRATEGY", "everything")])?;

  assert!(!output.status.success());
  assert!(!workspace.file_exists("artifacts"));

  Ok(())
}

#[test]
fn test_released_only_keeps_unreleased_versions() -> Result<()> {
  let manifest = NODE_MANIFEST.replace(
    "[[order]]",
    r#"[[metadata.dependencies]]
id = "node"
name = "Node Engine"
sha256 = "eee"
source = "https://nodejs.org/dist/v14.2.5/node-v14.2.5.tar.gz"
source_sha256 = "fff"
stacks = ["io.buildpacks.stacks.bionic", "org.cloudfoundry.stacks.cflinuxfs3"]
uri = "https://buildpacks.cloudfoundry.org/dependencies/node/node-14.2.5.tgz"
version = "14.2.5"

[[order]]"#,
  );
  let workspace = TestWorkspace::new(&manifest)?;
  workspace.set_released(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "any-stack")?;

  run_update(
    &workspace.path,
    &["--version-line-type", "major", "--removal-strategy", "released-only"],
    &[],
  )?;

  let written = workspace.read_file("artifacts/buildpack.toml")?;
  assert!(!written.contains(r#"version = "14.2.0""#));
  assert!(written.contains(r#"version = "14.2.5""#));
  assert!(written.contains(r#"version = "14.3.0""#));

  let message = workspace.last_commit_message("artifacts")?;
  assert!(message.starts_with("Add node 14.3.0, remove node 14.2.0\n\nfor stack(s) "));
  assert!(message.contains("org.cloudfoundry.stacks.cflinuxfs2"));

  Ok(())
}

#[test]
fn test_deprecation_entry_and_story_id() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "bionic")?;
  workspace.set_story("node", "14.3.0", 172635)?;

  let mut envs = MAJOR_LINE.to_vec();
  envs.extend([
    ("VERSION_LINE", "14.X.X"),
    ("DEPRECATION_DATE", "2023-04-30"),
    ("DEPRECATION_LINK", "https://github.com/nodejs/Release"),
    ("DEPRECATION_MATCH", "null"),
  ]);
  run_update(&workspace.path, &[], &envs)?;

  let manifest = workspace.read_file("artifacts/buildpack.toml")?;
  assert!(manifest.contains("[[metadata.dependency_deprecation_dates]]"));
  assert!(manifest.contains(r#"version_line = "14.x.x""#));
  assert!(manifest.contains("date = 2023-04-30"));
  assert!(!manifest.contains("match ="));

  assert!(workspace.last_commit_message("artifacts")?.ends_with(" [#172635]"));

  Ok(())
}

#[test]
fn test_dry_run_json_writes_nothing() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "bionic")?;

  let output = run_update(&workspace.path, &["--dry-run", "--json"], MAJOR_LINE)?;

  let json: serde_json::Value = serde_json::from_str(&stdout(&output))?;
  assert_eq!(json["outcome"], "dry-run");
  assert_eq!(json["summary"]["added"][0], "14.3.0");
  assert_eq!(json["summary"]["removed"][0], "14.2.0");
  assert!(json["message"].as_str().unwrap_or_default().starts_with("Add node 14.3.0"));
  assert!(!workspace.file_exists("artifacts"));

  Ok(())
}

#[test]
fn test_config_file_paths_and_identity() -> Result<()> {
  let workspace = TestWorkspace::new(NODE_MANIFEST)?;
  workspace.set_source("node", "14.3.0")?;
  workspace.add_build("node", "14.3.0", "bionic")?;
  std::fs::write(
    workspace.path.join("update-cnb.toml"),
    r#"
[paths]
artifacts = "out"

[git]
user_name = "Dependency Bot"
user_email = "bot@example.com"
"#,
  )?;

  run_update(&workspace.path, &[], MAJOR_LINE)?;

  assert!(workspace.file_exists("out/buildpack.toml"));
  assert!(!workspace.file_exists("artifacts"));
  let author = git(&workspace.path.join("out"), &["log", "-1", "--format=%an <%ae>"])?;
  assert_eq!(
    String::from_utf8_lossy(&author.stdout).trim(),
    "Dependency Bot <bot@example.com>"
  );

  Ok(())
}
