//! Top-level "fetch missing parts" workflow
//!
//! ```text
//! Idle ──► OverrideActive ──► PerTargetAttempt* ──► Reported ──► Idle
//!          (gate forced      (installer once,       (errors      (gate
//!           online)           then each target)      collected)   restored)
//! ```
//!
//! The override guard lives for the whole run, so the previous offline value
//! comes back on every exit path, including installer failures.

use crate::catalog::DependencyInstaller;
use crate::error::FetchError;
use crate::fanout::{AccumulatedErrors, BuildFanout};
use crate::pipeline::{BuildPipeline, BuildTarget, PipelineWork};
use crate::resolver::{FetchResolver, PartSource};

/// Result of running builds across targets
#[derive(Debug)]
pub struct FetchReport {
    /// Number of targets attempted
    pub attempted: usize,

    /// Targets that failed, in run order
    pub errors: AccumulatedErrors<BuildTarget>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ok when every target succeeded, otherwise a combined error
    pub fn into_result(self) -> anyhow::Result<()> {
        self.errors.into_result()
    }
}

/// Bring every part needed by `targets` into the cache
///
/// Offline mode is switched off for the duration of the call, using the gate
/// shared by the resolver, and restored afterwards whatever happens. Missing
/// project dependencies are installed first; an install failure aborts the
/// run before any target is attempted.
pub async fn fetch_missing_parts<I, P, S>(
    installer: &I,
    targets: &[BuildTarget],
    pipeline: &P,
    resolver: &FetchResolver<S>,
) -> Result<FetchReport, FetchError>
where
    I: DependencyInstaller + ?Sized,
    P: BuildPipeline<S>,
    S: PartSource,
{
    let _online = resolver.gate().scoped_override(false);

    let missing = installer.not_installed_dependencies();
    if !missing.is_empty() {
        tracing::info!("Installing {} missing dependencies", missing.len());
        installer
            .install_missing_dependencies()
            .await
            .map_err(|source| FetchError::DependencyInstall { source })?;
    }

    tracing::info!("Fetching missing parts...");
    Ok(build_targets(targets, pipeline, resolver).await)
}

/// Build every target under the current offline policy
pub async fn build_targets<P, S>(
    targets: &[BuildTarget],
    pipeline: &P,
    resolver: &FetchResolver<S>,
) -> FetchReport
where
    P: BuildPipeline<S>,
    S: PartSource,
{
    let work = PipelineWork::new(pipeline, resolver);
    let errors = BuildFanout::new().run(targets, &work).await;

    FetchReport {
        attempted: targets.len(),
        errors,
    }
}
