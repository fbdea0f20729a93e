//! surfboard - Stremio addon client and aggregator
//!
//! Loads a set of Stremio addons from their manifest URLs and answers
//! catalog, search, meta and stream queries by fanning out to every addon
//! that declares support, then merging what comes back.
//!
//! # Modules
//!
//! - `models` - Media items, episodes, streams, watch progress, favorites
//! - `api` - Addon protocol client and the multi-addon registry
//! - `config` - Addon URLs and preferences (TOML)
//! - `library` - Watch progress and favorites (JSON)
//! - `cli` / `commands` - Command line surface

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod library;
pub mod models;

// Re-export commonly used types
pub use models::{
    ContentType, Episode, FavoriteItem, HdrType, MediaItem, Quality, Stream, WatchProgress,
};

pub use api::{AddonClient, AddonError, AddonRegistry, CatalogResult, LoadState, Manifest};
pub use config::Config;
pub use library::Library;
