//! Dependency lock file management (.partfetch/lock.yaml)
//!
//! Tracks which packages are installed and at which version, so the
//! installer can tell what is missing without touching the network.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lock file name inside the project state directory
pub const LOCK_FILE: &str = "lock.yaml";

const LOCK_API_VERSION: &str = "partfetch.dev/v1";

/// The lock file lists installed packages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyLock {
    /// API version for schema compatibility
    pub api_version: String,
    /// When this lock file was last updated
    pub generated: String,
    /// Installed packages
    pub installed: Vec<InstalledPackage>,
}

/// An installed package entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPackage {
    /// Package name
    pub name: String,
    /// Installed version
    pub version: String,
    /// Content digest of the downloaded archive
    pub digest: Option<String>,
    /// When this package was installed
    pub installed_at: String,
}

impl Default for DependencyLock {
    fn default() -> Self {
        Self {
            api_version: LOCK_API_VERSION.to_string(),
            generated: chrono::Utc::now().to_rfc3339(),
            installed: Vec::new(),
        }
    }
}

impl DependencyLock {
    /// Load lock file or return default if not found
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save lock file to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut lock = self.clone();
        lock.generated = chrono::Utc::now().to_rfc3339();

        let content = serde_yaml_ng::to_string(&lock)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Add or replace an installed package
    pub fn add_installed(&mut self, name: &str, version: &str, digest: Option<String>) {
        self.installed.retain(|e| e.name != name);

        self.installed.push(InstalledPackage {
            name: name.to_string(),
            version: version.to_string(),
            digest,
            installed_at: chrono::Utc::now().to_rfc3339(),
        });
        self.installed.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Get the installed entry of a package
    pub fn get_installed(&self, name: &str) -> Option<&InstalledPackage> {
        self.installed.iter().find(|e| e.name == name)
    }

    /// Whether `name` is installed at exactly `version`
    pub fn is_installed(&self, name: &str, version: &str) -> bool {
        self.get_installed(name)
            .map(|e| e.version == version)
            .unwrap_or(false)
    }
}
