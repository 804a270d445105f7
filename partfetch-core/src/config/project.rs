//! Project manifest parsing (partfetch.yaml)
//!
//! The manifest names the project, its builds and the parts each build
//! needs, plus the packages the project depends on.
//!
//! ```yaml
//! name: my-board
//! builds:
//!   default:
//!     entry: main.ato:App
//!     parts: [C1, C25804]
//! dependencies:
//!   - name: generics
//!     version: 1.2.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::part::PartId;
use crate::pipeline::BuildTarget;

/// Manifest file name searched for when locating a project
pub const PROJECT_FILE: &str = "partfetch.yaml";

/// Name of the build used for ad-hoc entry addresses
const DEFAULT_BUILD: &str = "default";

/// A project manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Builds keyed by name
    #[serde(default)]
    pub builds: BTreeMap<String, BuildConfig>,

    /// Packages the project depends on
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// Directory containing the manifest
    #[serde(skip)]
    pub root: PathBuf,
}

/// One build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Design entry address (`file.ato:Module`)
    #[serde(default)]
    pub entry: Option<String>,

    /// Parts the design references
    #[serde(default)]
    pub parts: Vec<PartId>,
}

/// A package dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Package name
    pub name: String,

    /// Exact semantic version
    pub version: String,
}

impl ProjectConfig {
    /// Load the project containing `entry`, or the current directory
    ///
    /// `entry` may be a project directory, a manifest file or a design
    /// address such as `boards/main.ato:App`.
    pub fn discover(entry: Option<&str>) -> Result<Self, ConfigError> {
        let start = match entry.map(EntryPoint::parse) {
            Some(EntryPoint::Address { file, .. }) => file
                .parent()
                .map(Path::to_path_buf)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(".")),
            Some(EntryPoint::Path(path)) if path.is_file() => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            Some(EntryPoint::Path(path)) => path,
            None => std::env::current_dir().map_err(|source| ConfigError::ManifestRead {
                path: PathBuf::from("."),
                source,
            })?,
        };

        let root = find_project_root(&start)?;
        Self::load(&root)
    }

    /// Load `partfetch.yaml` from a project root
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(PROJECT_FILE);
        let content =
            std::fs::read_to_string(&path).map_err(|source| ConfigError::ManifestRead {
                path: path.clone(),
                source,
            })?;

        let mut config = Self::from_yaml(&content, &path)?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Parse and validate manifest YAML
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml_ng::from_str(content).map_err(|source| ConfigError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("project name is required".to_string()));
        }

        for dep in &self.dependencies {
            if dep.name.is_empty() || dep.name.contains(['/', '\\']) || dep.name.contains("..") {
                return Err(invalid(format!("invalid dependency name '{}'", dep.name)));
            }
            if semver::Version::parse(&dep.version).is_err() {
                return Err(invalid(format!(
                    "dependency '{}' has invalid version '{}'",
                    dep.name, dep.version
                )));
            }
        }

        Ok(())
    }

    /// Directory holding installed dependencies and the lock file
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".partfetch")
    }

    /// Resolve the builds to run
    ///
    /// An empty selection means every build, in name order. Selectors must
    /// name existing builds. A design address entry adds an ad-hoc target
    /// named after its module.
    pub fn select_builds(
        &self,
        entry: Option<&str>,
        selected: &[String],
    ) -> Result<Vec<BuildTarget>, ConfigError> {
        if let Some(EntryPoint::Address { file, module }) = entry.map(EntryPoint::parse) {
            let parts = self
                .builds
                .get(DEFAULT_BUILD)
                .map(|b| b.parts.clone())
                .unwrap_or_default();
            return Ok(vec![BuildTarget::new(
                module.clone(),
                Some(format!("{}:{}", file.display(), module)),
                parts,
            )]);
        }

        if selected.is_empty() {
            return Ok(self
                .builds
                .iter()
                .map(|(name, build)| self.target_for(name, build))
                .collect());
        }

        selected
            .iter()
            .map(|name| {
                self.builds
                    .get(name)
                    .map(|build| self.target_for(name, build))
                    .ok_or_else(|| ConfigError::UnknownBuild {
                        name: name.clone(),
                        available: self
                            .builds
                            .keys()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            })
            .collect()
    }

    fn target_for(&self, name: &str, build: &BuildConfig) -> BuildTarget {
        BuildTarget::new(name, build.entry.clone(), build.parts.clone())
    }
}

/// How the user pointed at the project
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryPoint {
    /// A directory or manifest path
    Path(PathBuf),
    /// A design address `file.ato:Module`
    Address { file: PathBuf, module: String },
}

impl EntryPoint {
    fn parse(entry: &str) -> Self {
        if let Some((file, module)) = entry.rsplit_once(':') {
            if file.ends_with(".ato") && !module.is_empty() {
                return EntryPoint::Address {
                    file: PathBuf::from(file),
                    module: module.to_string(),
                };
            }
        }
        EntryPoint::Path(PathBuf::from(entry))
    }
}

/// Walk up from `start` until a directory containing `partfetch.yaml` is found
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut dir = Some(start);
    while let Some(candidate) = dir {
        if candidate.join(PROJECT_FILE).is_file() {
            return Ok(candidate.to_path_buf());
        }
        dir = candidate.parent();
    }

    Err(ConfigError::NoProject {
        start: start.to_path_buf(),
    })
}
