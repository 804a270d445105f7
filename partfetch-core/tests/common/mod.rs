//! Test helper functions for integration tests
//!
//! Shared across test files using the tests/common/ pattern.

#![allow(dead_code)]

use anyhow::Result;
use partfetch_core::cache::{ArtifactCache, CachedArtifact};
use partfetch_core::PartId;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Once;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Write a `partfetch.yaml` manifest into `project_path`
pub fn write_manifest(project_path: &Path, content: &str) -> Result<()> {
    fs::create_dir_all(project_path)?;
    fs::write(project_path.join("partfetch.yaml"), content)?;
    Ok(())
}

/// Project with build `a` needing C1 and build `b` needing nothing
pub fn create_two_build_project(project_path: &Path) -> Result<()> {
    write_manifest(
        project_path,
        r#"name: test-board
builds:
  a:
    entry: main.ato:App
    parts: [C1]
  b:
    entry: docs.ato:Docs
    parts: []
"#,
    )
}

/// Store a part in the cache as if it had been fetched earlier
pub fn seed_cache(cache: &ArtifactCache, id: &str) -> Result<()> {
    let id = PartId::new(id)?;
    cache.store(&id, &CachedArtifact::new(id.clone(), json!({ "mpn": id.as_str() })))?;
    Ok(())
}

/// Gzipped tarball holding one package directory with a single source file
pub fn package_archive(name: &str) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let temp_dir = tempfile::TempDir::new()?;
    let package_dir = temp_dir.path().join(name);
    fs::create_dir_all(&package_dir)?;
    fs::write(package_dir.join("resistors.ato"), "module Resistor:\n")?;

    let mut bytes = Vec::new();
    {
        let encoder = GzEncoder::new(&mut bytes, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(name, &package_dir)?;
        builder.into_inner()?.finish()?;
    }

    Ok(bytes)
}

/// Digest string in the form the catalog serves
pub fn sha256_digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}
