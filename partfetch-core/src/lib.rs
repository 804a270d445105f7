//! Partfetch library exports
//!
//! Offline-aware fetching and caching of part data for hardware design
//! builds. See [`workflow::fetch_missing_parts`] for the top-level operation.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fanout;
pub mod offline;
pub mod part;
pub mod pipeline;
pub mod resolver;
pub mod workflow;

pub use error::{ConfigError, FetchError};
pub use offline::{OfflineGate, OfflineOverride};
pub use part::PartId;
