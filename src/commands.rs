//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the addon registry, the config
//! file and the local library. Each handler takes CLI args and Output,
//! returns ExitCode.

use serde::Serialize;
use std::path::PathBuf;

use crate::api::addon::http_client;
use crate::api::{AddonClient, AddonError, AddonRegistry, LoadState};
use crate::cli::{
    AddonUrlCmd, AddonsCmd, CatalogsCmd, ExitCode, FavoriteCmd, MetaCmd, Output, SearchCmd,
    SettingsCmd, StreamSort, StreamsCmd,
};
use crate::config::{language_name, normalize_url, Config};
use crate::library::Library;
use crate::models::{HdrType, MediaItem, Quality, Stream};

// =============================================================================
// Shared Setup
// =============================================================================

/// Where config and library live; `--config` moves both
#[derive(Debug, Clone, Default)]
pub struct Paths {
    pub config: Option<PathBuf>,
}

impl Paths {
    pub fn new(config: Option<PathBuf>) -> Self {
        Self { config }
    }

    pub fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    pub fn save_config(&self, config: &Config) -> anyhow::Result<()> {
        match &self.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
    }

    /// `library.json` in the same directory as the config file
    pub fn library_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.with_file_name("library.json")),
            None => Library::path(),
        }
    }

    pub fn load_library(&self) -> Library {
        self.library_path()
            .map(|p| Library::load_from(&p))
            .unwrap_or_default()
    }

    pub fn save_library(&self, library: &Library) -> anyhow::Result<()> {
        let path = self
            .library_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine library path"))?;
        library.save_to(&path)
    }
}

/// Load every configured addon; fails only when none of them loads
async fn connect(config: &Config, output: &Output) -> Result<AddonRegistry, ExitCode> {
    let urls = config.addon_urls();
    let registry = AddonRegistry::new(config.request_timeout());

    output.info(format!("Loading {} addons...", urls.len()));
    let loaded = registry.load_addons(&urls).await;

    if loaded == 0 {
        return Err(output.error("No addons could be loaded", ExitCode::NetworkError));
    }
    Ok(registry)
}

fn meta_error(e: AddonError, output: &Output) -> ExitCode {
    match e {
        AddonError::NoAddonFound { .. } => output.error(e.to_string(), ExitCode::NotFound),
        e => output.error(format!("Meta fetch failed: {}", e), ExitCode::NetworkError),
    }
}

fn print_or_fail<T: Serialize>(output: &Output, data: T) -> ExitCode {
    if let Err(e) = output.print(data) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Addons Command
// =============================================================================

#[derive(Serialize)]
struct AddonInfo {
    id: String,
    name: String,
    version: String,
    manifest_url: String,
    resources: Vec<String>,
    types: Vec<String>,
    catalogs: Vec<CatalogInfo>,
}

#[derive(Serialize)]
struct CatalogInfo {
    #[serde(rename = "type")]
    content_type: String,
    id: String,
    name: String,
    search: bool,
}

#[derive(Serialize)]
struct AddonsReport {
    state: LoadState,
    addons: Vec<AddonInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
}

pub async fn addons_cmd(cmd: AddonsCmd, paths: &Paths, output: &Output) -> ExitCode {
    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    let addons: Vec<AddonInfo> = registry
        .addons()
        .await
        .iter()
        .filter_map(|addon| {
            let manifest = addon.manifest().ok()?;
            Some(AddonInfo {
                id: manifest.id.clone(),
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                manifest_url: addon.manifest_url().to_string(),
                resources: manifest.resource_names().iter().map(|r| r.to_string()).collect(),
                types: manifest.types.clone(),
                catalogs: manifest
                    .catalogs
                    .iter()
                    .map(|c| CatalogInfo {
                        content_type: c.content_type.clone(),
                        id: c.id.clone(),
                        name: c.display_name(),
                        search: c.supports_search(),
                    })
                    .collect(),
            })
        })
        .collect();

    let failed: Vec<String> = if cmd.all {
        config
            .addon_urls()
            .into_iter()
            .filter(|url| {
                let wanted = normalize_url(url);
                !addons.iter().any(|a| normalize_url(&a.manifest_url) == wanted)
            })
            .collect()
    } else {
        Vec::new()
    };

    if output.json {
        let report = AddonsReport {
            state: registry.load_state().await,
            addons,
            failed,
        };
        return print_or_fail(output, report);
    }

    for addon in &addons {
        output.line(format!(
            "{} v{}  [{}]  {}",
            addon.name,
            addon.version,
            addon.resources.join(", "),
            addon.types.join("/")
        ));
    }
    for url in &failed {
        output.line(format!("FAILED  {}", url));
    }
    ExitCode::Success
}

// =============================================================================
// Catalogs Command
// =============================================================================

pub async fn catalogs_cmd(cmd: CatalogsCmd, paths: &Paths, output: &Output) -> ExitCode {
    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    let mut catalogs = registry.fetch_catalogs(&cmd.content_type).await;
    if catalogs.is_empty() {
        return output.error(
            format!("No catalogs available for type '{}'", cmd.content_type),
            ExitCode::NotFound,
        );
    }

    for catalog in &mut catalogs {
        catalog.items.truncate(cmd.limit);
    }

    if output.json {
        return print_or_fail(output, &catalogs);
    }

    for catalog in &catalogs {
        output.line(format!("== {} ({}) ==", catalog.catalog_name, catalog.addon_name));
        for item in &catalog.items {
            output.line(format!("  {}  {}", item.id, item));
        }
    }
    ExitCode::Success
}

// =============================================================================
// Search Command
// =============================================================================

#[derive(Serialize)]
struct SearchResults {
    #[serde(rename = "type")]
    content_type: &'static str,
    items: Vec<MediaItem>,
}

pub async fn search_cmd(cmd: SearchCmd, paths: &Paths, output: &Output) -> ExitCode {
    let query = cmd.query.trim();
    if query.is_empty() {
        return output.error("Search query must not be empty", ExitCode::InvalidArgs);
    }

    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    output.info(format!("Searching for: {}", query));

    let mut results = Vec::new();
    for content_type in cmd.types() {
        let mut items = registry.search_catalogs(content_type, query).await;
        items.truncate(cmd.limit);
        results.push(SearchResults { content_type, items });
    }

    if results.iter().all(|r| r.items.is_empty()) {
        return output.error(format!("No results for '{}'", query), ExitCode::NotFound);
    }

    if output.json {
        return print_or_fail(output, &results);
    }

    for result in results.iter().filter(|r| !r.items.is_empty()) {
        output.line(format!("== {} ==", result.content_type));
        for item in &result.items {
            output.line(format!("  {}  {}", item.id, item));
        }
    }
    ExitCode::Success
}

// =============================================================================
// Meta Command
// =============================================================================

pub async fn meta_cmd(cmd: MetaCmd, paths: &Paths, output: &Output) -> ExitCode {
    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    let item = match registry.fetch_meta(&cmd.content_type, &cmd.id).await {
        Ok(item) => item,
        Err(e) => return meta_error(e, output),
    };

    if output.json {
        return print_or_fail(output, &item);
    }

    output.line(&item);
    let genres = item.all_genres();
    if !genres.is_empty() {
        output.line(format!("Genres:   {}", genres.join(", ")));
    }
    if let Some(rating) = &item.imdb_rating {
        output.line(format!("IMDb:     {}", rating));
    }
    if let Some(director) = item.director_string() {
        output.line(format!("Director: {}", director));
    }
    if let Some(cast) = item.cast_string() {
        output.line(format!("Cast:     {}", cast));
    }
    if let Some(description) = &item.description {
        output.line("");
        output.line(description);
    }

    let seasons = item.episodes_by_season();
    if !seasons.is_empty() {
        output.line("");
        for (season, episodes) in &seasons {
            output.line(format!("Season {} ({} episodes)", season, episodes.len()));
        }
    }
    ExitCode::Success
}

// =============================================================================
// Streams Command
// =============================================================================

/// Stream plus the values mined from its title
#[derive(Serialize)]
struct IndexedStream {
    index: usize,
    id: String,
    quality: Quality,
    hdr: HdrType,
    #[serde(skip_serializing_if = "Option::is_none")]
    seeders: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    magnet: Option<String>,
    #[serde(flatten)]
    stream: Stream,
}

impl IndexedStream {
    fn new(index: usize, stream: Stream) -> Self {
        Self {
            index,
            id: stream.id(),
            quality: stream.resolution(),
            hdr: stream.hdr_type(),
            seeders: stream.seeders(),
            size_bytes: stream.size_bytes(),
            source: stream.source(),
            magnet: stream.magnet_url(),
            stream,
        }
    }
}

/// Filter by minimum quality, sort, and truncate to the limit
pub fn select_streams(
    mut streams: Vec<Stream>,
    min_quality: Option<Quality>,
    sort: StreamSort,
    limit: usize,
) -> Vec<Stream> {
    if let Some(min_quality) = min_quality {
        streams.retain(|s| s.resolution().rank() >= min_quality.rank());
    }

    // Stable sorts: ties keep addon order
    match sort {
        StreamSort::Addon => {}
        StreamSort::Seeds => streams.sort_by(|a, b| b.seeders().cmp(&a.seeders())),
        StreamSort::Quality => streams.sort_by(|a, b| b.resolution().cmp(&a.resolution())),
        StreamSort::Size => {
            streams.sort_by(|a, b| b.size_bytes().unwrap_or(0).cmp(&a.size_bytes().unwrap_or(0)))
        }
    }

    streams.truncate(limit);
    streams
}

pub async fn streams_cmd(cmd: StreamsCmd, paths: &Paths, output: &Output) -> ExitCode {
    let video_id = match cmd.video_id() {
        Ok(id) => id,
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };

    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    output.info(format!("Finding streams for: {}", video_id));

    let streams = registry.fetch_streams(&cmd.content_type, &video_id).await;
    if streams.is_empty() {
        return output.error("No streams found", ExitCode::NoStreams);
    }

    let streams = select_streams(
        streams,
        cmd.quality.map(|q| q.min_quality()),
        cmd.sort,
        cmd.limit,
    );
    if streams.is_empty() {
        let quality = cmd.quality.map(|q| q.to_string()).unwrap_or_default();
        return output.error(
            format!("No streams at {} or better", quality),
            ExitCode::NoStreams,
        );
    }

    if output.json {
        let indexed: Vec<IndexedStream> = streams
            .into_iter()
            .enumerate()
            .map(|(i, s)| IndexedStream::new(i, s))
            .collect();
        return print_or_fail(output, &indexed);
    }

    for (i, stream) in streams.iter().enumerate() {
        output.line(format!(
            "{:>3}. {}  ({})",
            i,
            stream,
            stream.display_name().replace('\n', " ")
        ));
    }
    ExitCode::Success
}

// =============================================================================
// Addon Management Commands
// =============================================================================

#[derive(Serialize)]
struct AddonChange {
    status: &'static str,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

pub async fn addon_add_cmd(cmd: AddonUrlCmd, paths: &Paths, output: &Output) -> ExitCode {
    let mut config = paths.load_config();

    let client = http_client(config.request_timeout());
    let addon = match AddonClient::new(&cmd.url, client) {
        Ok(addon) => addon,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };

    // Only keep addons that actually answer with a manifest
    let name = match addon.load_manifest().await {
        Ok(manifest) => manifest.name.clone(),
        Err(e) => {
            return output.error(
                format!("Could not load manifest: {}", e),
                ExitCode::NetworkError,
            )
        }
    };

    if !config.add_custom_addon(&cmd.url) {
        return output.error("Addon is already configured", ExitCode::InvalidArgs);
    }
    if let Err(e) = paths.save_config(&config) {
        return output.error(format!("Failed to save config: {}", e), ExitCode::Error);
    }

    if output.json {
        return print_or_fail(
            output,
            AddonChange {
                status: "added",
                url: addon.manifest_url().to_string(),
                name: Some(name),
            },
        );
    }
    output.line(format!("Added {} ({})", name, addon.manifest_url()));
    ExitCode::Success
}

pub async fn addon_remove_cmd(cmd: AddonUrlCmd, paths: &Paths, output: &Output) -> ExitCode {
    let mut config = paths.load_config();

    if !config.remove_custom_addon(&cmd.url) {
        return output.error(
            format!("No custom addon matches {}", cmd.url),
            ExitCode::NotFound,
        );
    }
    if let Err(e) = paths.save_config(&config) {
        return output.error(format!("Failed to save config: {}", e), ExitCode::Error);
    }

    if output.json {
        return print_or_fail(
            output,
            AddonChange {
                status: "removed",
                url: cmd.url,
                name: None,
            },
        );
    }
    output.line(format!("Removed {}", cmd.url));
    ExitCode::Success
}

// =============================================================================
// Settings Command
// =============================================================================

#[derive(Serialize)]
struct SettingsView {
    audio_language: String,
    subtitle_language: String,
    request_timeout_secs: u64,
    addons: Vec<String>,
}

pub async fn settings_cmd(cmd: SettingsCmd, paths: &Paths, output: &Output) -> ExitCode {
    let mut config = paths.load_config();

    if cmd.is_update() {
        if let Some(lang) = &cmd.audio_lang {
            if let Err(e) = config.set_audio_language(lang) {
                return output.error(e.to_string(), ExitCode::InvalidArgs);
            }
        }
        if let Some(lang) = &cmd.subtitle_lang {
            if let Err(e) = config.set_subtitle_language(lang) {
                return output.error(e.to_string(), ExitCode::InvalidArgs);
            }
        }
        if let Err(e) = paths.save_config(&config) {
            return output.error(format!("Failed to save config: {}", e), ExitCode::Error);
        }
    }

    let view = SettingsView {
        audio_language: config.preferred_audio_language.clone(),
        subtitle_language: config.preferred_subtitle_language.clone(),
        request_timeout_secs: config.request_timeout_secs,
        addons: config.addon_urls(),
    };

    if output.json {
        return print_or_fail(output, view);
    }

    let label = |code: &str| language_name(code).unwrap_or("None").to_string();
    output.line(format!("Audio:     {} ({})", label(&view.audio_language), view.audio_language));
    output.line(format!(
        "Subtitles: {} ({})",
        label(&view.subtitle_language),
        view.subtitle_language
    ));
    output.line(format!("Timeout:   {}s", view.request_timeout_secs));
    output.line("Addons:");
    for url in &view.addons {
        output.line(format!("  {}", url));
    }
    ExitCode::Success
}

// =============================================================================
// Library Commands
// =============================================================================

pub async fn continue_cmd(paths: &Paths, output: &Output) -> ExitCode {
    let library = paths.load_library();
    let entries = library.continue_watching();

    if output.json {
        return print_or_fail(output, &entries);
    }

    if entries.is_empty() {
        output.info("Nothing in progress");
    }
    for entry in entries {
        output.line(format!("{}  {}", entry.item_name, entry));
    }
    ExitCode::Success
}

pub async fn favorites_cmd(paths: &Paths, output: &Output) -> ExitCode {
    let library = paths.load_library();
    let favorites = library.favorites();

    if output.json {
        return print_or_fail(output, &favorites);
    }

    if favorites.is_empty() {
        output.info("No favorites yet");
    }
    for favorite in favorites {
        output.line(format!("{}  {} [{}]", favorite.id, favorite.name, favorite.content_type));
    }
    ExitCode::Success
}

#[derive(Serialize)]
struct FavoriteToggle {
    id: String,
    name: String,
    favorite: bool,
}

pub async fn favorite_cmd(cmd: FavoriteCmd, paths: &Paths, output: &Output) -> ExitCode {
    let config = paths.load_config();
    let registry = match connect(&config, output).await {
        Ok(r) => r,
        Err(code) => return code,
    };

    let item = match registry.fetch_meta(&cmd.content_type, &cmd.id).await {
        Ok(item) => item,
        Err(e) => return meta_error(e, output),
    };

    let mut library = paths.load_library();
    let favorite = library.toggle_favorite(&item);
    if let Err(e) = paths.save_library(&library) {
        return output.error(format!("Failed to save library: {}", e), ExitCode::Error);
    }

    if output.json {
        return print_or_fail(
            output,
            FavoriteToggle {
                id: item.id,
                name: item.name,
                favorite,
            },
        );
    }

    if favorite {
        output.line(format!("Added {} to favorites", item.name));
    } else {
        output.line(format!("Removed {} from favorites", item.name));
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(title: &str) -> Stream {
        serde_json::from_value(serde_json::json!({ "name": "Torrentio", "title": title })).unwrap()
    }

    fn titles(streams: &[Stream]) -> Vec<&str> {
        streams.iter().map(|s| s.display_title()).collect()
    }

    #[test]
    fn test_select_streams_keeps_addon_order() {
        let streams = vec![stream("a 720p"), stream("b 2160p"), stream("c 1080p")];
        let selected = select_streams(streams, None, StreamSort::Addon, 10);
        assert_eq!(titles(&selected), vec!["a 720p", "b 2160p", "c 1080p"]);
    }

    #[test]
    fn test_select_streams_quality_filter_and_sort() {
        let streams = vec![
            stream("a 720p"),
            stream("b 2160p"),
            stream("c 1080p"),
            stream("d unknown"),
        ];
        let selected = select_streams(
            streams,
            Some(Quality::FHD1080p),
            StreamSort::Quality,
            10,
        );
        assert_eq!(titles(&selected), vec!["b 2160p", "c 1080p"]);
    }

    #[test]
    fn test_select_streams_by_seeds_and_limit() {
        let streams = vec![
            stream("a 👤 5"),
            stream("b"),
            stream("c 👤 1.2k"),
            stream("d 👤 40"),
        ];
        let selected = select_streams(streams, None, StreamSort::Seeds, 2);
        assert_eq!(titles(&selected), vec!["c 👤 1.2k", "d 👤 40"]);
    }

    #[test]
    fn test_select_streams_by_size() {
        let streams = vec![stream("a 💾 700 MB"), stream("b 💾 4.2 GB"), stream("c")];
        let selected = select_streams(streams, None, StreamSort::Size, 10);
        assert_eq!(titles(&selected), vec!["b 💾 4.2 GB", "a 💾 700 MB", "c"]);
    }

    #[test]
    fn test_library_path_follows_config() {
        let paths = Paths::new(Some(PathBuf::from("/tmp/x/config.toml")));
        assert_eq!(paths.library_path(), Some(PathBuf::from("/tmp/x/library.json")));
    }

    #[test]
    fn test_paths_roundtrip_config_and_library() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(Some(dir.path().join("config.toml")));

        let mut config = paths.load_config();
        config.set_audio_language("de").unwrap();
        paths.save_config(&config).unwrap();
        assert_eq!(paths.load_config().preferred_audio_language, "de");

        let mut library = paths.load_library();
        library.toggle_favorite(&MediaItem::new("tt1", "movie".into(), "One"));
        paths.save_library(&library).unwrap();
        assert!(paths.load_library().is_favorite("tt1"));
    }
}
