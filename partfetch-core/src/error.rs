//! Error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving, fetching or caching parts
#[derive(Error, Debug)]
pub enum FetchError {
    /// A catalog request was attempted while offline mode is active
    #[error("Cannot {operation}: the catalog API is not available because offline mode is active")]
    NotConfigured { operation: String },

    /// A part must be fetched but offline mode forbids it
    #[error("Part '{part_id}' is not cached and cannot be fetched because offline mode is active.\n\nTo download missing parts, run:\n  partfetch fetch-parts\n\nor unset PARTFETCH_OFFLINE.")]
    MissingCachedArtifact { part_id: String },

    /// Several parts of one build must be fetched but offline mode forbids it
    #[error("{} part(s) are not cached and cannot be fetched because offline mode is active: {}\n\nTo download missing parts, run:\n  partfetch fetch-parts\n\nor unset PARTFETCH_OFFLINE.", .part_ids.len(), quoted(.part_ids))]
    MissingCachedArtifacts { part_ids: Vec<String> },

    /// The cache has no entry for the part
    #[error("Part '{part_id}' is not in the local cache")]
    NotCached { part_id: String },

    /// The part identifier cannot be used as a cache key
    #[error("Invalid part identifier '{part_id}': {reason}")]
    InvalidPartId { part_id: String, reason: String },

    /// Failed to read a cached artifact
    #[error("Failed to read cached artifact from {path}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a cached artifact
    #[error("Failed to write cached artifact to {path}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached artifact is corrupted
    #[error("Failed to parse cached artifact {path} (corrupted or invalid format)")]
    CacheParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The HTTP request could not be completed
    #[error("Catalog request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The catalog base URL cannot address resources by path
    #[error("Invalid catalog URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The catalog answered with a non-success status
    #[error("Catalog request failed: HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The catalog response body could not be decoded
    #[error("Failed to decode catalog response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Installing project dependencies failed
    #[error("Failed to install missing dependencies")]
    DependencyInstall {
        #[source]
        source: anyhow::Error,
    },
}

impl FetchError {
    /// Whether this error was caused by offline mode rather than a real failure
    pub fn is_offline_block(&self) -> bool {
        matches!(
            self,
            FetchError::NotConfigured { .. }
                | FetchError::MissingCachedArtifact { .. }
                | FetchError::MissingCachedArtifacts { .. }
        )
    }
}

fn quoted(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration and project discovery errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A boolean environment flag holds an unrecognized token
    #[error("Invalid value '{value}' for {key}. Expected one of: 1, true, yes, 0, false, no")]
    InvalidFlag { key: String, value: String },

    /// No project manifest could be found
    #[error("No partfetch.yaml found in {start} or any parent directory")]
    NoProject { start: PathBuf },

    /// Failed to read the project manifest
    #[error("Failed to read project manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the project manifest
    #[error("Failed to parse project manifest {path}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The manifest content is inconsistent
    #[error("Invalid project manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    /// A build selector names a build the project does not define
    #[error("Build '{name}' is not defined in the project. Available builds: {available}")]
    UnknownBuild { name: String, available: String },

    /// No cache directory could be determined for this platform
    #[error("Could not determine a cache directory. Set PARTFETCH_CACHE_DIR")]
    NoCacheDir,
}
