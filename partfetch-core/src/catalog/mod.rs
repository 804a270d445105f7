//! Parts catalog access
//!
//! # Overview
//!
//! The catalog is the remote source of truth for part data and project
//! packages. Everything here reaches it through [`CatalogClient`], which
//! refuses to touch the network while offline mode is active.
//!
//! # Architecture
//!
//! ```text
//! Catalog API
//!     │
//!     ├── /v1/parts/{id}                         ← Part metadata and footprints
//!     └── /v1/packages/{name}/releases/{version} ← Package archives
//!            │
//!            ▼
//!     CatalogClient (offline gate checked per call)
//!            │
//!            ├── FetchResolver → parts cache
//!            └── ProjectDependencies
//!                   │
//!                   ▼
//!            .partfetch/modules/   ← Installed packages
//!            .partfetch/lock.yaml  ← Version tracking
//! ```

mod client;
mod installer;
mod lock;

pub use client::{CatalogClient, CatalogResponse};
pub use installer::{DependencyId, DependencyInstaller, PackageRelease, ProjectDependencies};
pub use lock::{DependencyLock, InstalledPackage, LOCK_FILE};
