//! Stremio addon protocol
//!
//! - manifest: addon capability descriptor
//! - addon: HTTP client for a single addon
//! - registry: the active addon set, fan-out and merge
//! - error: shared error type

pub mod addon;
pub mod error;
pub mod manifest;
pub mod registry;

pub use addon::AddonClient;
pub use error::AddonError;
pub use manifest::{Manifest, ManifestCatalog, ManifestResource};
pub use registry::{AddonRegistry, CatalogResult, LoadState};
