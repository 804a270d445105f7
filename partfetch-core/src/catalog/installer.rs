//! Project dependency installation
//!
//! Downloads, verifies and extracts package archives listed in the project
//! manifest into `.partfetch/modules/`, recording each install in the lock
//! file. All network access goes through [`CatalogClient`], so installs are
//! blocked like any other request while offline mode is active.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

use super::client::CatalogClient;
use super::lock::{DependencyLock, LOCK_FILE};
use crate::config::{DependencySpec, ProjectConfig};

/// Installed packages directory inside the project state directory
const MODULES_DIR: &str = "modules";

/// Identifies one package at one version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyId {
    pub name: String,
    pub version: String,
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl From<&DependencySpec> for DependencyId {
    fn from(spec: &DependencySpec) -> Self {
        Self {
            name: spec.name.clone(),
            version: spec.version.clone(),
        }
    }
}

/// Installs project-level dependencies
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    /// Dependencies declared by the project but not installed
    fn not_installed_dependencies(&self) -> BTreeSet<DependencyId>;

    /// Install everything reported by [`Self::not_installed_dependencies`]
    async fn install_missing_dependencies(&self) -> Result<()>;
}

/// Release metadata served by the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRelease {
    /// Archive download URL
    pub url: String,

    /// Expected archive digest (`sha256:<hex>`)
    #[serde(default)]
    pub digest: Option<String>,
}

/// Installer for the dependencies of one project
pub struct ProjectDependencies {
    dependencies: Vec<DependencySpec>,
    state_dir: PathBuf,
    client: CatalogClient,
}

impl ProjectDependencies {
    /// Installer for the dependencies declared in a project manifest
    pub fn new(project: &ProjectConfig, client: CatalogClient) -> Self {
        Self::with_state_dir(project.dependencies.clone(), project.state_dir(), client)
    }

    /// Installer with an explicit state directory
    pub fn with_state_dir(
        dependencies: Vec<DependencySpec>,
        state_dir: PathBuf,
        client: CatalogClient,
    ) -> Self {
        Self {
            dependencies,
            state_dir,
            client,
        }
    }

    fn modules_dir(&self) -> PathBuf {
        self.state_dir.join(MODULES_DIR)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }

    /// Get the installation directory for a package
    pub fn install_path(&self, name: &str) -> PathBuf {
        self.modules_dir().join(name)
    }

    fn load_lock(&self) -> DependencyLock {
        DependencyLock::load_from_path(&self.lock_path()).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable lock file: {:#}", e);
            DependencyLock::default()
        })
    }

    /// Download, verify and extract one package
    async fn install(&self, dep: &DependencyId) -> Result<Option<String>> {
        let release: PackageRelease = self
            .client
            .get_segments(&[
                "v1",
                "packages",
                dep.name.as_str(),
                "releases",
                dep.version.as_str(),
            ])
            .await?
            .json()?;

        tracing::info!("Downloading {} from {}", dep, release.url);
        let bytes = self
            .client
            .download(&release.url)
            .await
            .with_context(|| format!("Failed to download {dep}"))?;

        if let Some(expected) = &release.digest {
            verify_digest(&bytes, expected)?;
            tracing::debug!("Verified digest: {}", expected);
        }

        let install_dir = self.extract_package(&dep.name, &bytes)?;
        tracing::info!("Installed {} to {}", dep, install_dir.display());

        Ok(release.digest)
    }

    /// Extract an archive and move its root directory into place
    fn extract_package(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let modules_dir = self.modules_dir();
        std::fs::create_dir_all(&modules_dir)?;

        // Unpack next to the final location so the rename stays on one filesystem
        let staging = tempfile::tempdir_in(&modules_dir)?;
        let archive = flate2::read::GzDecoder::new(Cursor::new(bytes));
        tar::Archive::new(archive)
            .unpack(staging.path())
            .context("Failed to extract package archive")?;

        let package_root = std::fs::read_dir(staging.path())?
            .filter_map(|e| e.ok())
            .find(|e| e.path().is_dir())
            .context("No directory found in package archive")?;

        let install_dir = self.install_path(name);
        if install_dir.exists() {
            std::fs::remove_dir_all(&install_dir)?;
        }
        std::fs::rename(package_root.path(), &install_dir)
            .with_context(|| format!("Failed to install package to {}", install_dir.display()))?;

        Ok(install_dir)
    }
}

#[async_trait]
impl DependencyInstaller for ProjectDependencies {
    fn not_installed_dependencies(&self) -> BTreeSet<DependencyId> {
        let lock = self.load_lock();
        self.dependencies
            .iter()
            .filter(|dep| {
                !lock.is_installed(&dep.name, &dep.version) || !self.install_path(&dep.name).is_dir()
            })
            .map(DependencyId::from)
            .collect()
    }

    async fn install_missing_dependencies(&self) -> Result<()> {
        let missing = self.not_installed_dependencies();
        if missing.is_empty() {
            return Ok(());
        }

        let mut lock = self.load_lock();
        for dep in &missing {
            let digest = self
                .install(dep)
                .await
                .with_context(|| format!("Failed to install {dep}"))?;
            lock.add_installed(&dep.name, &dep.version, digest);
            lock.save_to_path(&self.lock_path())?;
        }

        Ok(())
    }
}

/// Verify the SHA256 digest of downloaded content
fn verify_digest(bytes: &[u8], expected: &str) -> Result<()> {
    let actual = format!("sha256:{}", hex::encode(Sha256::digest(bytes)));

    if actual != expected {
        anyhow::bail!(
            "Digest verification failed!\nExpected: {}\nActual: {}",
            expected,
            actual
        );
    }

    Ok(())
}
