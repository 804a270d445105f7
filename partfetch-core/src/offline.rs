//! Offline mode gate
//!
//! A single boolean shared by every component that may touch the network.
//! Clones of an [`OfflineGate`] observe the same value, so the catalog client,
//! the resolver and the workflow always agree on whether fetching is allowed.
//!
//! Temporary changes go through [`OfflineGate::scoped_override`], which hands
//! back a guard restoring the previous value when it is dropped. Nested
//! overrides each remember the value they replaced, forming a save/restore
//! stack.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{parse_flag, OFFLINE_ENV};
use crate::error::ConfigError;

static GLOBAL_GATE: Lazy<OfflineGate> = Lazy::new(|| match OfflineGate::from_env() {
    Ok(gate) => gate,
    Err(e) => {
        tracing::warn!("{}; starting with offline mode disabled", e);
        OfflineGate::new(false)
    }
});

/// Process-wide switch deciding whether network calls may be attempted
#[derive(Debug, Clone)]
pub struct OfflineGate {
    offline: Arc<AtomicBool>,
}

impl OfflineGate {
    /// Create a gate with an explicit initial value
    pub fn new(offline: bool) -> Self {
        Self {
            offline: Arc::new(AtomicBool::new(offline)),
        }
    }

    /// Create a gate seeded from `PARTFETCH_OFFLINE`
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var(OFFLINE_ENV).ok();
        Ok(Self::new(parse_flag(OFFLINE_ENV, value.as_deref())?))
    }

    /// The lazily initialized gate shared by the whole process
    pub fn global() -> &'static OfflineGate {
        &GLOBAL_GATE
    }

    /// Whether offline mode is currently active
    pub fn read(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Set offline mode
    pub fn set(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Set offline mode until the returned guard is dropped
    ///
    /// The previous value is restored on every exit path: normal return,
    /// early return through `?`, panic unwinding, or a cancelled future
    /// holding the guard.
    #[must_use = "the override ends as soon as the guard is dropped"]
    pub fn scoped_override(&self, offline: bool) -> OfflineOverride {
        let previous = self.offline.swap(offline, Ordering::SeqCst);
        tracing::debug!(previous, offline, "Offline mode overridden");
        OfflineOverride {
            gate: self.clone(),
            previous,
        }
    }
}

/// Guard returned by [`OfflineGate::scoped_override`]
#[derive(Debug)]
pub struct OfflineOverride {
    gate: OfflineGate,
    previous: bool,
}

impl OfflineOverride {
    /// The value that will be restored when this guard drops
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl Drop for OfflineOverride {
    fn drop(&mut self) {
        self.gate.set(self.previous);
        tracing::debug!(offline = self.previous, "Offline mode restored");
    }
}
