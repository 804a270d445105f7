//! Build targets and the build pipeline seam
//!
//! The real design build (parsing, part picking, layout) lives outside this
//! crate. It plugs in through [`BuildPipeline`] and asks the resolver for
//! every part it needs. [`ManifestPipeline`] is the built-in pipeline: it
//! resolves the parts listed for the build in `partfetch.yaml`.

use async_trait::async_trait;
use std::fmt;

use crate::error::FetchError;
use crate::fanout::{Target, TargetWork};
use crate::part::PartId;
use crate::resolver::{BlockReason, FetchResolver, PartSource, Resolution};

/// One selected build of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    name: String,
    entry: Option<String>,
    parts: Vec<PartId>,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, entry: Option<String>, parts: Vec<PartId>) -> Self {
        Self {
            name: name.into(),
            entry,
            parts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Design entry address, if the build names one
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    /// Parts the build references
    pub fn parts(&self) -> &[PartId] {
        &self.parts
    }
}

impl Target for BuildTarget {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Performs the design build of one target
#[async_trait]
pub trait BuildPipeline<S: PartSource>: Send + Sync {
    async fn build(&self, target: &BuildTarget, resolver: &FetchResolver<S>)
        -> anyhow::Result<()>;
}

/// Pipeline resolving the parts each build lists in the manifest
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestPipeline;

#[async_trait]
impl<S: PartSource> BuildPipeline<S> for ManifestPipeline {
    async fn build(
        &self,
        target: &BuildTarget,
        resolver: &FetchResolver<S>,
    ) -> anyhow::Result<()> {
        let mut fetched = 0;
        let mut blocked = Vec::new();
        for id in target.parts() {
            match resolver.resolve(id).await? {
                Resolution::CacheHit(_) => tracing::debug!("{} is already cached", id),
                Resolution::FetchedAndStored(_) => fetched += 1,
                Resolution::Blocked(BlockReason::OfflineMissingArtifact { part_id }) => {
                    blocked.push(part_id.to_string())
                }
            }
        }

        // Every uncached part of the target is reported, not only the first
        if !blocked.is_empty() {
            return Err(FetchError::MissingCachedArtifacts { part_ids: blocked }.into());
        }

        tracing::info!(
            "All {} part(s) for '{}' are cached ({} newly fetched)",
            target.parts().len(),
            target.name(),
            fetched
        );
        Ok(())
    }
}

/// Adapts a pipeline and resolver into per-target fan-out work
pub struct PipelineWork<'a, P, S: PartSource> {
    pipeline: &'a P,
    resolver: &'a FetchResolver<S>,
}

impl<'a, P, S: PartSource> PipelineWork<'a, P, S> {
    pub fn new(pipeline: &'a P, resolver: &'a FetchResolver<S>) -> Self {
        Self { pipeline, resolver }
    }
}

#[async_trait]
impl<'a, P, S> TargetWork<BuildTarget> for PipelineWork<'a, P, S>
where
    P: BuildPipeline<S>,
    S: PartSource,
{
    async fn run(&self, target: &BuildTarget) -> anyhow::Result<()> {
        self.pipeline.build(target, self.resolver).await
    }
}
