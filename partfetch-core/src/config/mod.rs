//! Runtime configuration
//!
//! ## Configuration Sources
//!
//! Settings are read once from the environment when [`Settings::from_env`]
//! runs:
//!
//! - `PARTFETCH_OFFLINE` - seeds the offline gate (`1`/`true`/`yes` enable it)
//! - `PARTFETCH_API_URL` - base URL of the parts catalog
//! - `PARTFETCH_CACHE_DIR` - root of the local artifact cache
//!
//! Project-level configuration lives in `partfetch.yaml`, see [`project`].

pub mod project;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub use project::{find_project_root, BuildConfig, DependencySpec, ProjectConfig, PROJECT_FILE};

/// Environment variable enabling offline mode
pub const OFFLINE_ENV: &str = "PARTFETCH_OFFLINE";

/// Environment variable overriding the catalog URL
pub const API_URL_ENV: &str = "PARTFETCH_API_URL";

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "PARTFETCH_CACHE_DIR";

/// Default catalog URL
pub const DEFAULT_API_URL: &str = "https://components.partfetch.dev";

/// Default timeout for catalog requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Process settings resolved from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Initial value of the offline gate
    pub offline: bool,

    /// Base URL of the parts catalog
    pub api_url: String,

    /// Root directory of the artifact cache
    pub cache_dir: PathBuf,

    /// Timeout applied to every catalog request
    pub timeout: Duration,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let offline = parse_flag(OFFLINE_ENV, lookup(OFFLINE_ENV).as_deref())?;

        let api_url = lookup(API_URL_ENV)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let cache_dir = match lookup(CACHE_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        Ok(Self {
            offline,
            api_url,
            cache_dir,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

/// Parse a boolean environment flag
///
/// Accepts `1`, `true`, `yes` as true and `0`, `false`, `no` or an empty
/// string as false, ignoring case and surrounding whitespace. An unset
/// variable is false.
pub fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(false);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Platform cache directory for partfetch
fn default_cache_dir() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("dev", "partfetch", "partfetch")
        .map(|dirs| dirs.cache_dir().join("parts"))
        .or_else(|| dirs::cache_dir().map(|d| d.join("partfetch").join("parts")))
        .ok_or(ConfigError::NoCacheDir)
}
