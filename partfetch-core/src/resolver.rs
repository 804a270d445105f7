//! Offline-aware part resolution
//!
//! Combines the artifact cache with a part source (normally the catalog
//! client) into one "get data for part P" operation:
//!
//! 1. A fresh cache entry is returned as-is, even in offline mode.
//! 2. A missing or stale entry in offline mode is blocked.
//! 3. Otherwise the part is fetched, stored and returned.

use async_trait::async_trait;

use crate::cache::{ArtifactCache, CachedArtifact};
use crate::error::FetchError;
use crate::offline::OfflineGate;
use crate::part::PartId;

/// Somewhere fresh part data can be fetched from
#[async_trait]
pub trait PartSource: Send + Sync {
    /// Fetch the catalog payload of a part
    async fn fetch_part(&self, id: &PartId) -> Result<serde_json::Value, FetchError>;
}

/// Why a part could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The part needs fetching but offline mode forbids network access
    OfflineMissingArtifact { part_id: PartId },
}

impl From<BlockReason> for FetchError {
    fn from(reason: BlockReason) -> Self {
        match reason {
            BlockReason::OfflineMissingArtifact { part_id } => FetchError::MissingCachedArtifact {
                part_id: part_id.to_string(),
            },
        }
    }
}

/// Outcome of resolving one part
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Served from the cache without touching the network
    CacheHit(CachedArtifact),
    /// Fetched from the source and written to the cache
    FetchedAndStored(CachedArtifact),
    /// Not available under the current policy
    Blocked(BlockReason),
}

impl Resolution {
    /// Convert into the artifact, turning a block into an error
    pub fn into_artifact(self) -> Result<CachedArtifact, FetchError> {
        match self {
            Resolution::CacheHit(artifact) | Resolution::FetchedAndStored(artifact) => Ok(artifact),
            Resolution::Blocked(reason) => Err(reason.into()),
        }
    }
}

/// Resolves parts through the cache, fetching when allowed
pub struct FetchResolver<S: PartSource> {
    cache: ArtifactCache,
    source: S,
    gate: OfflineGate,
}

impl<S: PartSource> FetchResolver<S> {
    pub fn new(cache: ArtifactCache, source: S, gate: OfflineGate) -> Self {
        Self {
            cache,
            source,
            gate,
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn gate(&self) -> &OfflineGate {
        &self.gate
    }

    /// Decide how a part is obtained and carry it out
    ///
    /// Source failures propagate unchanged; retrying is the transport's job.
    pub async fn resolve(&self, id: &PartId) -> Result<Resolution, FetchError> {
        if !self.cache.needs_refresh(id) {
            tracing::debug!("Using cached data for {}", id);
            return Ok(Resolution::CacheHit(self.cache.load(id)?));
        }

        if self.gate.read() {
            tracing::debug!("{} needs fetching but offline mode is active", id);
            return Ok(Resolution::Blocked(BlockReason::OfflineMissingArtifact {
                part_id: id.clone(),
            }));
        }

        let payload = self.source.fetch_part(id).await?;
        let artifact = CachedArtifact::new(id.clone(), payload);
        self.cache.store(id, &artifact)?;

        Ok(Resolution::FetchedAndStored(artifact))
    }

    /// Get the data of a part, failing if offline mode blocks it
    pub async fn get_part_data(&self, id: &PartId) -> Result<CachedArtifact, FetchError> {
        self.resolve(id).await?.into_artifact()
    }
}
