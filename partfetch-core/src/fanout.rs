//! Per-target fan-out with isolated error collection
//!
//! Runs one unit of work per build target, in order. A failing target is
//! recorded and logged, and the remaining targets still run. The caller
//! receives every failure in an [`AccumulatedErrors`] value and decides what
//! a non-empty result means.

use async_trait::async_trait;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::Instrument;

/// Anything the fan-out can run work for
pub trait Target {
    /// Human-readable name used in logs and reports
    fn display_name(&self) -> &str;
}

/// The work performed for each target
#[async_trait]
pub trait TargetWork<T: Sync>: Send + Sync {
    async fn run(&self, target: &T) -> anyhow::Result<()>;
}

/// One failed target and its error
#[derive(Debug)]
pub struct TargetFailure<T> {
    pub target: T,
    pub error: anyhow::Error,
}

/// Ordered failures collected across a fan-out run
#[derive(Debug)]
pub struct AccumulatedErrors<T> {
    failures: Vec<TargetFailure<T>>,
}

impl<T> Default for AccumulatedErrors<T> {
    fn default() -> Self {
        Self {
            failures: Vec::new(),
        }
    }
}

impl<T: Target> AccumulatedErrors<T> {
    fn push(&mut self, target: T, error: anyhow::Error) {
        self.failures.push(TargetFailure { target, error });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failures in the order the targets ran
    pub fn failures(&self) -> &[TargetFailure<T>] {
        &self.failures
    }

    /// Names of the failed targets
    pub fn failed_targets(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|f| f.target.display_name())
            .collect()
    }

    /// Ok when nothing failed, otherwise one error naming every failure
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        Err(anyhow::anyhow!("{}", self))
    }
}

impl<T: Target> fmt::Display for AccumulatedErrors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} build target(s) failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(
                f,
                "\n  - {}: {:#}",
                failure.target.display_name(),
                failure.error
            )?;
        }
        Ok(())
    }
}

/// Runs work across targets without letting one failure abort the rest
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildFanout;

impl BuildFanout {
    pub fn new() -> Self {
        Self
    }

    /// Run `work` for every target in order
    ///
    /// Errors and panics raised by the work are caught per target.
    pub async fn run<T, W>(&self, targets: &[T], work: &W) -> AccumulatedErrors<T>
    where
        T: Target + Clone + Sync,
        W: TargetWork<T> + ?Sized,
    {
        let mut errors = AccumulatedErrors::default();

        for target in targets {
            let name = target.display_name().to_string();
            let span = tracing::info_span!("build", target = %name);

            let outcome = async {
                tracing::info!("Processing build '{}'", name);
                AssertUnwindSafe(work.run(target)).catch_unwind().await
            }
            .instrument(span)
            .await;

            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(panic) => anyhow::anyhow!("build panicked: {}", panic_message(&*panic)),
            };

            tracing::error!("Build '{}' failed: {:#}", name, error);
            errors.push(target.clone(), error);
        }

        errors
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
