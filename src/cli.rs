//! CLI - Command Line Interface for surfboard
//!
//! Browse Stremio addons from the terminal. Every command can print JSON
//! for scripting.
//!
//! # Examples
//!
//! ```bash
//! # What's loaded
//! surfboard addons
//!
//! # Browse and search
//! surfboard catalogs movie
//! surfboard search "the batman" --type movie --json
//!
//! # Details and streams
//! surfboard meta series tt0903747
//! surfboard streams series tt0903747 --season 1 --episode 1 --quality 1080p
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::Quality;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Nothing answered for the requested item
    NotFound = 4,
    /// No streams available
    NoStreams = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// surfboard - browse Stremio addons from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "surfboard",
    version,
    author = "Marcus Nilszén",
    about = "Browse Stremio addon catalogs, metadata and streams",
    long_about = "Loads the configured Stremio addons (Cinemeta, Torrentio and any \
                  custom ones) and answers catalog, search, meta and stream queries \
                  by asking every addon that supports them.",
    after_help = "EXAMPLES:\n\
                  surfboard catalogs movie                 Popular movies\n\
                  surfboard search \"blade runner\"          Search all catalogs\n\
                  surfboard streams movie tt1856101 -Q 4k  4K streams only\n\
                  surfboard addon-add stremio://addon.example/manifest.json"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List loaded addons and what they serve
    Addons(AddonsCmd),

    /// Show the first catalog of every catalog addon
    #[command(visible_alias = "cat")]
    Catalogs(CatalogsCmd),

    /// Search every searchable catalog
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Get full metadata for an item
    #[command(visible_alias = "i")]
    Meta(MetaCmd),

    /// Get available streams for an item
    #[command(visible_alias = "st")]
    Streams(StreamsCmd),

    /// Add a custom addon by manifest URL
    AddonAdd(AddonUrlCmd),

    /// Remove a custom addon
    AddonRemove(AddonUrlCmd),

    /// Show or change preferences
    Settings(SettingsCmd),

    /// Items with unfinished watch progress
    #[command(name = "continue")]
    ContinueWatching,

    /// List favorites
    Favorites,

    /// Toggle an item's favorite status
    #[command(visible_alias = "fav")]
    Favorite(FavoriteCmd),
}

// =============================================================================
// Addons Command
// =============================================================================

/// List loaded addons
#[derive(Args, Debug)]
pub struct AddonsCmd {
    /// Also list configured URLs that failed to load
    #[arg(long, short = 'a')]
    pub all: bool,
}

// =============================================================================
// Catalog / Search Commands
// =============================================================================

/// Browse catalogs for a content type
#[derive(Args, Debug)]
pub struct CatalogsCmd {
    /// Content type (movie, series, or any type an addon declares)
    #[arg(required = true)]
    pub content_type: String,

    /// Maximum number of items per catalog
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

/// Search catalogs by query
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    /// Restrict to one type (default: movies and series)
    #[arg(long = "type", short = 't', value_enum)]
    pub content_type: Option<TypeFilter>,

    /// Maximum number of results per type
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

impl SearchCmd {
    /// Types to search, in output order
    pub fn types(&self) -> Vec<&'static str> {
        match self.content_type {
            Some(filter) => vec![filter.as_str()],
            None => vec![TypeFilter::Movie.as_str(), TypeFilter::Series.as_str()],
        }
    }
}

/// Content type filter for search
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    /// Movies only
    Movie,
    /// Series only
    #[value(alias = "tv")]
    Series,
}

impl TypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::Movie => "movie",
            TypeFilter::Series => "series",
        }
    }
}

// =============================================================================
// Meta Command
// =============================================================================

/// Get full metadata for an item
#[derive(Args, Debug)]
pub struct MetaCmd {
    /// Content type (movie, series, ...)
    #[arg(required = true)]
    pub content_type: String,

    /// Item id (e.g., tt1877830)
    #[arg(required = true)]
    pub id: String,
}

// =============================================================================
// Streams Command
// =============================================================================

/// Get available streams for a movie or series episode
#[derive(Args, Debug)]
pub struct StreamsCmd {
    /// Content type (movie, series, ...)
    #[arg(required = true)]
    pub content_type: String,

    /// Item id (e.g., tt1877830) or full episode id (tt0903747:1:1)
    #[arg(required = true)]
    pub id: String,

    /// Season number (for series)
    #[arg(long, short = 's', requires = "episode")]
    pub season: Option<u32>,

    /// Episode number (for series)
    #[arg(long, short = 'e', requires = "season")]
    pub episode: Option<u32>,

    /// Filter by minimum quality
    #[arg(long, short = 'Q', value_enum)]
    pub quality: Option<QualityFilter>,

    /// Maximum number of results
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,

    /// Sort by criterion
    #[arg(long, value_enum, default_value = "addon")]
    pub sort: StreamSort,
}

impl StreamsCmd {
    /// Id sent to stream addons: `id:season:episode` for episodes
    pub fn video_id(&self) -> Result<String, &'static str> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err("Item id must not be empty");
        }

        match (self.season, self.episode) {
            (Some(season), Some(episode)) => Ok(format!("{}:{}:{}", id, season, episode)),
            (None, None) => Ok(id.to_string()),
            _ => Err("--season and --episode must be given together"),
        }
    }
}

/// Quality filter for streams
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityFilter {
    /// 4K / 2160p
    #[value(name = "4k", alias = "2160p")]
    Q4k,
    /// 1080p Full HD
    #[value(name = "1080p")]
    Q1080p,
    /// 720p HD
    #[value(name = "720p")]
    Q720p,
    /// 480p SD
    #[value(name = "480p")]
    Q480p,
}

impl QualityFilter {
    /// Lowest stream quality that passes this filter
    pub fn min_quality(&self) -> Quality {
        match self {
            QualityFilter::Q4k => Quality::UHD4K,
            QualityFilter::Q1080p => Quality::FHD1080p,
            QualityFilter::Q720p => Quality::HD720p,
            QualityFilter::Q480p => Quality::SD480p,
        }
    }
}

impl std::fmt::Display for QualityFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityFilter::Q4k => write!(f, "4K"),
            QualityFilter::Q1080p => write!(f, "1080p"),
            QualityFilter::Q720p => write!(f, "720p"),
            QualityFilter::Q480p => write!(f, "480p"),
        }
    }
}

/// Sort criterion for streams
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamSort {
    /// Keep addon order (default)
    #[default]
    Addon,
    /// Sort by seed count
    Seeds,
    /// Sort by quality
    Quality,
    /// Sort by file size
    Size,
}

// =============================================================================
// Addon Management Commands
// =============================================================================

/// Addon manifest URL argument
#[derive(Args, Debug)]
pub struct AddonUrlCmd {
    /// Manifest URL (https:// or stremio://)
    #[arg(required = true)]
    pub url: String,
}

// =============================================================================
// Settings Command
// =============================================================================

/// Show or change preferences (no flags prints current settings)
#[derive(Args, Debug)]
pub struct SettingsCmd {
    /// Preferred audio language (en, sv, de, fr, es, it, pt, ru, ja, ko, zh)
    #[arg(long)]
    pub audio_lang: Option<String>,

    /// Preferred subtitle language (same codes, or "none")
    #[arg(long)]
    pub subtitle_lang: Option<String>,
}

impl SettingsCmd {
    pub fn is_update(&self) -> bool {
        self.audio_lang.is_some() || self.subtitle_lang.is_some()
    }
}

// =============================================================================
// Favorite Command
// =============================================================================

/// Toggle favorite status for an item
#[derive(Args, Debug)]
pub struct FavoriteCmd {
    /// Content type (movie, series, ...)
    #[arg(required = true)]
    pub content_type: String,

    /// Item id (e.g., tt1877830)
    #[arg(required = true)]
    pub id: String,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            // Non-JSON callers usually render lines themselves
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a line of human-readable output
    pub fn line(&self, msg: impl std::fmt::Display) {
        println!("{}", msg);
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
