//! Integration tests for the `partfetch` binary
//!
//! The catalog URL points at a closed local port, so any command that
//! succeeds here did so without touching the network.

use anyhow::Result;
use partfetch_core::cache::{ArtifactCache, CachedArtifact};
use partfetch_core::PartId;
use serial_test::serial;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const UNREACHABLE_CATALOG: &str = "http://127.0.0.1:9";

const MANIFEST: &str = r#"name: test-board
builds:
  a:
    entry: main.ato:App
    parts: [C1]
  b:
    entry: docs.ato:Docs
    parts: []
"#;

struct Workspace {
    project: TempDir,
    cache: TempDir,
}

impl Workspace {
    fn new() -> Result<Self> {
        let project = TempDir::new()?;
        fs::write(project.path().join("partfetch.yaml"), MANIFEST)?;
        Ok(Self {
            project,
            cache: TempDir::new()?,
        })
    }

    fn seed(&self, id: &str) -> Result<()> {
        let cache = ArtifactCache::new(self.cache.path());
        let id = PartId::new(id)?;
        cache.store(&id, &CachedArtifact::new(id.clone(), serde_json::json!({})))?;
        Ok(())
    }

    fn run(&self, args: &[&str], offline: Option<&str>) -> Result<Output> {
        run_partfetch(self.project.path(), self.cache.path(), args, offline)
    }
}

fn run_partfetch(
    project: &Path,
    cache: &Path,
    args: &[&str],
    offline: Option<&str>,
) -> Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_partfetch"));
    cmd.args(args)
        .current_dir(project)
        .env("PARTFETCH_CACHE_DIR", cache)
        .env("PARTFETCH_API_URL", UNREACHABLE_CATALOG)
        .env("NO_COLOR", "1")
        .env_remove("PARTFETCH_BUILD")
        .env_remove("RUST_LOG");
    match offline {
        Some(value) => cmd.env("PARTFETCH_OFFLINE", value),
        None => cmd.env_remove("PARTFETCH_OFFLINE"),
    };
    Ok(cmd.output()?)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
#[serial]
fn test_offline_build_with_missing_part_fails() -> Result<()> {
    let ws = Workspace::new()?;

    let output = ws.run(&["build"], Some("1"))?;

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("'C1'"), "stderr: {err}");
    assert!(err.contains("partfetch fetch-parts"), "stderr: {err}");
    Ok(())
}

#[test]
#[serial]
fn test_offline_build_with_cached_parts_succeeds() -> Result<()> {
    let ws = Workspace::new()?;
    ws.seed("C1")?;

    let output = ws.run(&["build"], Some("true"))?;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    Ok(())
}

#[test]
#[serial]
fn test_offline_flag_blocks_build() -> Result<()> {
    let ws = Workspace::new()?;

    let output = ws.run(&["--offline", "build", "-b", "a"], None)?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("offline mode"));
    Ok(())
}

#[test]
#[serial]
fn test_fetch_parts_with_everything_cached() -> Result<()> {
    let ws = Workspace::new()?;
    ws.seed("C1")?;

    let output = ws.run(&["fetch-parts"], Some("1"))?;

    let err = stderr(&output);
    assert!(output.status.success(), "stderr: {err}");
    assert!(err.contains("Part fetching complete! All required parts are now cached."));
    assert!(err.contains("PARTFETCH_OFFLINE=1"));
    Ok(())
}

#[test]
#[serial]
fn test_fetch_parts_reports_unreachable_catalog() -> Result<()> {
    let ws = Workspace::new()?;

    let output = ws.run(&["fetch-parts"], Some("1"))?;

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("1 build target(s) failed"), "stderr: {err}");
    assert!(!err.contains("Part fetching complete!"));
    Ok(())
}

#[test]
#[serial]
fn test_unknown_build_is_rejected() -> Result<()> {
    let ws = Workspace::new()?;

    let output = ws.run(&["build", "--build", "nope"], Some("1"))?;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("nope"));
    Ok(())
}

#[test]
#[serial]
fn test_invalid_offline_flag_is_rejected() -> Result<()> {
    let ws = Workspace::new()?;

    let output = ws.run(&["build"], Some("maybe"))?;

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("PARTFETCH_OFFLINE"), "stderr: {err}");
    assert!(err.contains("maybe"), "stderr: {err}");
    Ok(())
}

#[test]
#[serial]
fn test_cache_list_and_clear() -> Result<()> {
    let ws = Workspace::new()?;
    ws.seed("C1")?;
    ws.seed("C25804")?;

    let output = ws.run(&["cache", "list", "--json"], None)?;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["part_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["C1", "C25804"]);

    let output = ws.run(&["cache", "clear"], None)?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 2 cached part(s)"));

    let output = ws.run(&["cache", "list", "--json"], None)?;
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listed, serde_json::json!([]));
    Ok(())
}
