//! Local artifact cache
//!
//! Stores the last fetched payload of every part as one YAML file under the
//! cache directory. Whether an entry is still usable is decided by an
//! injected freshness predicate; by default any entry that was ever fetched
//! is considered fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FetchError;
use crate::part::PartId;

/// Extension of cache entry files
const ENTRY_EXTENSION: &str = "yaml";

/// Decides whether a cached artifact must be fetched again
pub type RefreshPredicate = Arc<dyn Fn(&CachedArtifact) -> bool + Send + Sync>;

/// Predicate treating every cached entry as fresh
pub fn refresh_never() -> RefreshPredicate {
    Arc::new(|_| false)
}

/// Predicate forcing every entry to be fetched again
pub fn refresh_always() -> RefreshPredicate {
    Arc::new(|_| true)
}

/// The cached payload of one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArtifact {
    /// Part this payload belongs to
    pub part_id: PartId,

    /// When the payload was fetched from the catalog
    pub fetched_at: DateTime<Utc>,

    /// Catalog data for the part
    pub payload: serde_json::Value,
}

impl CachedArtifact {
    /// Wrap a freshly fetched payload
    pub fn new(part_id: PartId, payload: serde_json::Value) -> Self {
        Self {
            part_id,
            fetched_at: Utc::now(),
            payload,
        }
    }
}

/// Directory-backed store of part artifacts
#[derive(Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    shall_refresh: RefreshPredicate,
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl ArtifactCache {
    /// Open a cache rooted at `dir`
    ///
    /// The directory is created lazily on the first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            shall_refresh: refresh_never(),
        }
    }

    /// Replace the freshness predicate
    pub fn with_refresh_predicate(mut self, shall_refresh: RefreshPredicate) -> Self {
        self.shall_refresh = shall_refresh;
        self
    }

    /// Root directory of the cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &PartId) -> PathBuf {
        self.dir.join(format!("{}.{}", id.as_str(), ENTRY_EXTENSION))
    }

    /// Whether an entry exists for the part
    pub fn has(&self, id: &PartId) -> bool {
        self.entry_path(id).is_file()
    }

    /// Load the cached artifact of a part
    pub fn load(&self, id: &PartId) -> Result<CachedArtifact, FetchError> {
        let path = self.entry_path(id);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotCached {
                    part_id: id.to_string(),
                })
            }
            Err(source) => return Err(FetchError::CacheRead { path, source }),
        };

        serde_yaml_ng::from_str(&content).map_err(|source| FetchError::CacheParse { path, source })
    }

    /// Whether the part must be fetched before use
    ///
    /// True when there is no entry or the freshness predicate rejects it.
    /// Unreadable entries also need a refresh so an online fetch repairs them.
    pub fn needs_refresh(&self, id: &PartId) -> bool {
        if !self.has(id) {
            return true;
        }

        match self.load(id) {
            Ok(artifact) => (self.shall_refresh)(&artifact),
            Err(e) => {
                tracing::warn!("Ignoring unusable cache entry for {}: {}", id, e);
                true
            }
        }
    }

    /// Insert or replace the artifact of a part
    pub fn store(&self, id: &PartId, artifact: &CachedArtifact) -> Result<(), FetchError> {
        let path = self.entry_path(id);
        let write_err = |source| FetchError::CacheWrite {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;

        let content = serde_yaml_ng::to_string(artifact)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        // Write next to the target so the rename stays on one filesystem
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::debug!("Cached {} at {}", id, path.display());
        Ok(())
    }

    /// List all readable cache entries, sorted by part id
    pub fn list(&self) -> Result<Vec<CachedArtifact>, FetchError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FetchError::CacheRead {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut artifacts = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(id) = cache_entry_id(&path) else {
                continue;
            };
            match self.load(&id) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => tracing::warn!("Skipping cache entry {}: {}", path.display(), e),
            }
        }

        artifacts.sort_by(|a, b| a.part_id.cmp(&b.part_id));
        Ok(artifacts)
    }

    /// Remove every cache entry, returning how many were deleted
    pub fn clear(&self) -> Result<usize, FetchError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(FetchError::CacheRead {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if cache_entry_id(&path).is_some() {
                std::fs::remove_file(&path)
                    .map_err(|source| FetchError::CacheWrite { path, source })?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

fn cache_entry_id(path: &Path) -> Option<PartId> {
    if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| PartId::new(s).ok())
}
