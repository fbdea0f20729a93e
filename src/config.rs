//! Configuration management for surfboard
//!
//! Handles config file loading/saving and addon URL resolution.
//! Config is stored at ~/.config/surfboard/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::addon::rewrite_stremio_scheme;

/// Public Cinemeta manifest (metadata + catalogs)
pub const DEFAULT_CINEMETA_URL: &str = "https://v3-cinemeta.strem.io/manifest.json";

/// Public Torrentio manifest (streams)
pub const DEFAULT_TORRENTIO_URL: &str = "https://torrentio.strem.fun/manifest.json";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Language codes accepted for audio and subtitle preferences
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("sv", "Swedish"),
    ("de", "German"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
];

/// Built-in addon slots, in load order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAddon {
    Cinemeta,
    Torrentio,
    MediaFusion,
}

impl BuiltinAddon {
    pub const ALL: [BuiltinAddon; 3] = [
        BuiltinAddon::Cinemeta,
        BuiltinAddon::Torrentio,
        BuiltinAddon::MediaFusion,
    ];

    /// Environment variable that overrides this slot
    pub fn env_key(&self) -> &'static str {
        match self {
            BuiltinAddon::Cinemeta => "CINEMETA",
            BuiltinAddon::Torrentio => "TORRENTIO",
            BuiltinAddon::MediaFusion => "MEDIAFUSION",
        }
    }

    fn default_url(&self) -> Option<&'static str> {
        match self {
            BuiltinAddon::Cinemeta => Some(DEFAULT_CINEMETA_URL),
            BuiltinAddon::Torrentio => Some(DEFAULT_TORRENTIO_URL),
            BuiltinAddon::MediaFusion => None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cinemeta manifest URL override
    pub cinemeta: Option<String>,
    /// Torrentio manifest URL override (usually carries a personal config path)
    pub torrentio: Option<String>,
    /// MediaFusion manifest URL
    pub mediafusion: Option<String>,
    /// User-added addon manifest URLs
    pub custom_addons: Vec<String>,
    /// Preferred audio language (ISO 639-1)
    pub preferred_audio_language: String,
    /// Preferred subtitle language (ISO 639-1, or "none")
    pub preferred_subtitle_language: String,
    /// Per-request timeout for addon calls
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cinemeta: None,
            torrentio: None,
            mediafusion: None,
            custom_addons: Vec::new(),
            preferred_audio_language: "en".to_string(),
            preferred_subtitle_language: "en".to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/surfboard/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("surfboard").join("config.toml"))
    }

    /// Load config from the default location, or defaults if not found
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from a file, or defaults if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Resolve a built-in addon URL with fallback chain:
    /// 1. Environment variable (CINEMETA, TORRENTIO, MEDIAFUSION)
    /// 2. Value from config file
    /// 3. Bundled default
    pub fn builtin_url(&self, addon: BuiltinAddon) -> Option<String> {
        let from_env = std::env::var(addon.env_key()).ok();
        let from_file = match addon {
            BuiltinAddon::Cinemeta => self.cinemeta.clone(),
            BuiltinAddon::Torrentio => self.torrentio.clone(),
            BuiltinAddon::MediaFusion => self.mediafusion.clone(),
        };

        [from_env, from_file]
            .into_iter()
            .flatten()
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty())
            .or_else(|| addon.default_url().map(str::to_string))
    }

    /// All addon manifest URLs to load: built-ins first, then custom ones
    ///
    /// `stremio://` is rewritten to `https://` and entries that normalize to
    /// the same URL are dropped after the first.
    pub fn addon_urls(&self) -> Vec<String> {
        let builtins = BuiltinAddon::ALL
            .iter()
            .filter_map(|addon| self.builtin_url(*addon));
        let custom = self.custom_addons.iter().map(|url| url.trim().to_string());

        let mut seen = HashSet::new();
        builtins
            .chain(custom)
            .filter(|url| !url.is_empty())
            .filter(|url| seen.insert(normalize_url(url)))
            .map(|url| rewrite_stremio_scheme(&url))
            .collect()
    }

    /// Add a custom addon; false if empty or already configured
    pub fn add_custom_addon(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }

        let normalized = normalize_url(url);
        if self.addon_urls().iter().any(|u| normalize_url(u) == normalized) {
            return false;
        }

        self.custom_addons.push(url.to_string());
        true
    }

    /// Remove a custom addon by normalized URL; false if it wasn't there
    pub fn remove_custom_addon(&mut self, url: &str) -> bool {
        let normalized = normalize_url(url.trim());
        let before = self.custom_addons.len();
        self.custom_addons.retain(|u| normalize_url(u) != normalized);
        self.custom_addons.len() != before
    }

    pub fn set_audio_language(&mut self, code: &str) -> Result<()> {
        let code = code.trim().to_lowercase();
        if language_name(&code).is_none() {
            anyhow::bail!("Unknown audio language: {}", code);
        }
        self.preferred_audio_language = code;
        Ok(())
    }

    /// Accepts the known languages plus "none"
    pub fn set_subtitle_language(&mut self, code: &str) -> Result<()> {
        let code = code.trim().to_lowercase();
        if code != "none" && language_name(&code).is_none() {
            anyhow::bail!("Unknown subtitle language: {}", code);
        }
        self.preferred_subtitle_language = code;
        Ok(())
    }
}

/// Comparison key for addon URLs: lowercase, https scheme, no trailing slashes
pub fn normalize_url(url: &str) -> String {
    let lowered = rewrite_stremio_scheme(&url.trim().to_lowercase());
    lowered.trim_end_matches('/').to_string()
}

/// Display name for an ISO 639-1 code from [`LANGUAGES`]
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
