//! Local library: watch progress and favorites
//!
//! Persisted as JSON next to the config file
//! (~/.config/surfboard/library.json).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{FavoriteItem, MediaItem, WatchProgress};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub progress: Vec<WatchProgress>,
    pub favorites: Vec<FavoriteItem>,
}

impl Library {
    /// Get library file path (~/.config/surfboard/library.json)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("surfboard").join("library.json"))
    }

    /// Load from the default location, or an empty library
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load from a file; a missing or corrupt file yields an empty library
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt library");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine library path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Watch progress
    // -------------------------------------------------------------------------

    /// Insert or replace the entry with the same progress id
    pub fn record_progress(&mut self, progress: WatchProgress) {
        match self.progress.iter_mut().find(|p| p.id == progress.id) {
            Some(existing) => *existing = progress,
            None => self.progress.push(progress),
        }
    }

    pub fn progress_for(&self, item_id: &str, episode_id: Option<&str>) -> Option<&WatchProgress> {
        let id = WatchProgress::progress_id(item_id, episode_id);
        self.progress.iter().find(|p| p.id == id)
    }

    /// Unfinished entries, most recently watched first
    pub fn continue_watching(&self) -> Vec<&WatchProgress> {
        let mut entries: Vec<&WatchProgress> = self
            .progress
            .iter()
            .filter(|p| !p.is_nearly_finished())
            .collect();
        entries.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        entries
    }

    pub fn remove_progress(&mut self, id: &str) -> bool {
        let before = self.progress.len();
        self.progress.retain(|p| p.id != id);
        self.progress.len() != before
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------

    /// Star or unstar an item; returns whether it is a favorite afterwards
    pub fn toggle_favorite(&mut self, item: &MediaItem) -> bool {
        if self.remove_favorite(&item.id) {
            return false;
        }
        self.favorites.push(FavoriteItem::from(item));
        true
    }

    pub fn remove_favorite(&mut self, id: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| f.id != id);
        self.favorites.len() != before
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f.id == id)
    }

    /// Newest first
    pub fn favorites(&self) -> Vec<&FavoriteItem> {
        let mut favorites: Vec<&FavoriteItem> = self.favorites.iter().collect();
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        favorites
    }
}
