//! Data structures shared across surfboard
//!
//! Contains the records that flow between addons, the aggregator and callers:
//! - **Media**: catalog/meta items and their episodes
//! - **Streams**: playable source candidates and the metadata mined from their titles
//! - **Library**: watch progress and favorites kept by the record store
//!
//! Everything here is plain data plus pure derived accessors, no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Media Models
// =============================================================================

/// Content type of an item
///
/// Addons are free to invent types (`channel`, `tv`, `anime`...), so anything
/// other than `movie`/`series` is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Movie,
    Series,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
            ContentType::Other(s) => s,
        }
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "movie" => ContentType::Movie,
            "series" => ContentType::Series,
            _ => ContentType::Other(s),
        }
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        ContentType::from(s.to_string())
    }
}

impl From<ContentType> for String {
    fn from(t: ContentType) -> String {
        match t {
            ContentType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry or full meta record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,

    #[serde(default, rename = "imdb_id")]
    pub imdb_id: Option<String>,
    #[serde(default, rename = "moviedb_id")]
    pub moviedb_id: Option<u64>,

    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub release_info: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub awards: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub imdb_rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub popularity: Option<f64>,

    #[serde(default)]
    pub cast: Option<Vec<String>>,
    #[serde(default)]
    pub director: Option<Vec<String>>,
    #[serde(default)]
    pub writer: Option<Vec<String>>,

    #[serde(default)]
    pub genre: Option<Vec<String>>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,

    #[serde(default)]
    pub videos: Option<Vec<Episode>>,

    #[serde(default)]
    pub trailers: Option<Vec<Trailer>>,
    #[serde(default)]
    pub trailer_streams: Option<Vec<TrailerStream>>,
    #[serde(default)]
    pub links: Option<Vec<MediaLink>>,
    #[serde(default)]
    pub behavior_hints: Option<MediaBehaviorHints>,
    #[serde(default)]
    pub dvd_release: Option<String>,
}

impl MediaItem {
    /// Minimal record, mostly useful for tests and previews
    pub fn new(id: impl Into<String>, content_type: ContentType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type,
            name: name.into(),
            imdb_id: None,
            moviedb_id: None,
            poster: None,
            background: None,
            logo: None,
            description: None,
            year: None,
            release_info: None,
            released: None,
            runtime: None,
            country: None,
            awards: None,
            slug: None,
            imdb_rating: None,
            popularity: None,
            cast: None,
            director: None,
            writer: None,
            genre: None,
            genres: None,
            videos: None,
            trailers: None,
            trailer_streams: None,
            links: None,
            behavior_hints: None,
            dvd_release: None,
        }
    }

    pub fn is_movie(&self) -> bool {
        self.content_type == ContentType::Movie
    }

    pub fn is_series(&self) -> bool {
        self.content_type == ContentType::Series
    }

    /// Some addons send `genres`, some the older `genre`
    pub fn all_genres(&self) -> &[String] {
        self.genres
            .as_deref()
            .or(self.genre.as_deref())
            .unwrap_or(&[])
    }

    pub fn cast_string(&self) -> Option<String> {
        join_names(self.cast.as_deref())
    }

    pub fn director_string(&self) -> Option<String> {
        join_names(self.director.as_deref())
    }

    pub fn writer_string(&self) -> Option<String> {
        join_names(self.writer.as_deref())
    }

    pub fn released_date(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.released.as_deref()?)
    }

    /// Episodes grouped by season, declaration order kept within a season
    pub fn episodes_by_season(&self) -> BTreeMap<u32, Vec<&Episode>> {
        let mut seasons: BTreeMap<u32, Vec<&Episode>> = BTreeMap::new();
        for episode in self.videos.iter().flatten() {
            seasons.entry(episode.season).or_default().push(episode);
        }
        seasons
    }

    /// Season numbers, ascending
    pub fn seasons(&self) -> Vec<u32> {
        self.episodes_by_season().into_keys().collect()
    }

    /// Artwork for a tile: episode thumbnail, then background, then poster
    pub fn artwork<'a>(&'a self, episode: Option<&'a Episode>) -> Option<&'a str> {
        episode
            .and_then(|e| e.thumbnail.as_deref())
            .or(self.background.as_deref())
            .or(self.poster.as_deref())
    }

    /// Movie name, or `Name - S1 E5 - Episode name` for an episode
    pub fn display_title(&self, episode: Option<&Episode>) -> String {
        match episode {
            Some(ep) => match &ep.name {
                Some(ep_name) => format!("{} - {} - {}", self.name, ep.label(), ep_name),
                None => format!("{} - {}", self.name, ep.label()),
            },
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self
            .year
            .as_deref()
            .or(self.release_info.as_deref())
            .map(|y| format!(" ({})", y))
            .unwrap_or_default();
        write!(f, "{}{} [{}]", self.name, year, self.content_type)
    }
}

/// One video of a series (`videos` in the meta record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub season: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub first_aired: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, rename = "tvdb_id")]
    pub tvdb_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
}

/// Identity of an episode across the app: parent item, season, number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub parent_id: String,
    pub season: u32,
    pub number: u32,
}

impl Episode {
    /// The alternate `episode` field wins over `number` when present
    pub fn effective_number(&self) -> u32 {
        self.episode.unwrap_or(self.number)
    }

    pub fn key(&self, parent_id: &str) -> EpisodeKey {
        EpisodeKey {
            parent_id: parent_id.to_string(),
            season: self.season,
            number: self.effective_number(),
        }
    }

    /// `S1 E5`
    pub fn label(&self) -> String {
        format!("S{} E{}", self.season, self.effective_number())
    }

    pub fn display_description(&self) -> Option<&str> {
        self.description.as_deref().or(self.overview.as_deref())
    }

    pub fn released_date(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.released.as_deref().or(self.first_aired.as_deref())?)
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "S{:02}E{:02} - {}",
                self.season,
                self.effective_number(),
                name
            ),
            None => write!(f, "S{:02}E{:02}", self.season, self.effective_number()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub source: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Trailer {
    pub fn youtube_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailerStream {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub yt_id: Option<String>,
}

impl TrailerStream {
    pub fn youtube_url(&self) -> Option<String> {
        self.yt_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaLink {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBehaviorHints {
    #[serde(default)]
    pub default_video_id: Option<String>,
    #[serde(default)]
    pub has_scheduled_videos: Option<bool>,
}

// =============================================================================
// Stream Models
// =============================================================================

/// Video resolution mined from stream titles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Quality {
    UHD4K,
    FHD1080p,
    HD720p,
    SD480p,
    #[default]
    Unknown,
}

impl Quality {
    /// Parse quality from free text (e.g., "Torrentio\n4k", "Movie.1080p.WEB")
    pub fn from_str_loose(s: &str) -> Self {
        let s_lower = s.to_lowercase();
        if s_lower.contains("2160p") || s_lower.contains("4k") || s_lower.contains("uhd") {
            Quality::UHD4K
        } else if s_lower.contains("1080p") || s_lower.contains("fhd") {
            Quality::FHD1080p
        } else if s_lower.contains("720p") {
            Quality::HD720p
        } else if s_lower.contains("480p") {
            Quality::SD480p
        } else {
            Quality::Unknown
        }
    }

    /// Quality ranking for sorting (higher = better)
    pub fn rank(&self) -> u8 {
        match self {
            Quality::UHD4K => 4,
            Quality::FHD1080p => 3,
            Quality::HD720p => 2,
            Quality::SD480p => 1,
            Quality::Unknown => 0,
        }
    }

    /// Short label for badges, empty when unknown
    pub fn badge(&self) -> &'static str {
        match self {
            Quality::UHD4K => "4K",
            Quality::FHD1080p => "1080p",
            Quality::HD720p => "720p",
            Quality::SD480p => "480p",
            Quality::Unknown => "",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Unknown => write!(f, "???"),
            q => f.write_str(q.badge()),
        }
    }
}

impl Ord for Quality {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Quality {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Dynamic range advertised by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdrType {
    Sdr,
    Hdr10,
    Hdr10Plus,
    DolbyVision,
    DvHdr,
}

impl HdrType {
    pub fn from_str_loose(s: &str) -> Self {
        let lower = s.to_lowercase();
        let dolby_vision = lower.contains("dolby vision")
            || lower.contains("dovi")
            || regex::Regex::new(r"\bdv\b")
                .map(|re| re.is_match(&lower))
                .unwrap_or(false);

        if dolby_vision {
            if lower.contains("hdr") {
                HdrType::DvHdr
            } else {
                HdrType::DolbyVision
            }
        } else if lower.contains("hdr10+") {
            HdrType::Hdr10Plus
        } else if lower.contains("hdr") {
            HdrType::Hdr10
        } else {
            HdrType::Sdr
        }
    }
}

impl fmt::Display for HdrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HdrType::Sdr => write!(f, "SDR"),
            HdrType::Hdr10 => write!(f, "HDR10"),
            HdrType::Hdr10Plus => write!(f, "HDR10+"),
            HdrType::DolbyVision => write!(f, "DV"),
            HdrType::DvHdr => write!(f, "DV HDR"),
        }
    }
}

/// Stream source from any addon
///
/// Quality, seeds, size and the like are not structured fields in the
/// protocol; addons pack them into `name`/`title` as emoji and keyword
/// tokens, which the accessors below mine on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub info_hash: Option<String>,
    #[serde(default)]
    pub file_idx: Option<u32>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub behavior_hints: Option<StreamBehaviorHints>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subtitles: Option<Vec<Subtitle>>,
    #[serde(default)]
    pub external_url: Option<String>,

    #[serde(skip, default = "Uuid::new_v4")]
    local_id: Uuid,
}

impl Stream {
    /// `infoHash`, else `url`, else an id minted when this value was created
    pub fn id(&self) -> String {
        self.info_hash
            .clone()
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| self.local_id.to_string())
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown Source")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    pub fn filename(&self) -> Option<&str> {
        self.behavior_hints.as_ref()?.filename.as_deref()
    }

    pub fn binge_group(&self) -> Option<&str> {
        self.behavior_hints.as_ref()?.binge_group.as_deref()
    }

    /// Magnet URI with the filename as `dn` and every `tracker:` source as `tr`
    pub fn magnet_url(&self) -> Option<String> {
        let info_hash = self.info_hash.as_ref()?;
        let mut magnet = format!("magnet:?xt=urn:btih:{}", info_hash);

        if let Some(filename) = self.filename() {
            magnet.push_str("&dn=");
            magnet.push_str(&urlencoding::encode(filename));
        }

        for source in self.sources.iter().flatten() {
            if let Some(tracker) = source.strip_prefix("tracker:") {
                magnet.push_str("&tr=");
                magnet.push_str(&urlencoding::encode(tracker));
            }
        }

        Some(magnet)
    }

    pub fn resolution(&self) -> Quality {
        match Quality::from_str_loose(self.title.as_deref().unwrap_or_default()) {
            Quality::Unknown => Quality::from_str_loose(self.name.as_deref().unwrap_or_default()),
            q => q,
        }
    }

    pub fn quality_badge(&self) -> &'static str {
        self.resolution().badge()
    }

    pub fn hdr_type(&self) -> HdrType {
        HdrType::from_str_loose(&self.title_and_name())
    }

    pub fn seeders(&self) -> Option<u32> {
        parse_seeders(self.title.as_deref()?)
    }

    /// Size as printed in the title, e.g. "6.91 GB"
    pub fn file_size(&self) -> Option<String> {
        parse_size_label(self.title.as_deref()?)
    }

    /// Size in bytes: the `videoSize` hint when present, else parsed from the title
    pub fn size_bytes(&self) -> Option<u64> {
        self.behavior_hints
            .as_ref()
            .and_then(|h| h.video_size)
            .or_else(|| parse_size(self.title.as_deref()?))
    }

    /// Indexer the torrent came from, e.g. "YTS"
    pub fn source(&self) -> Option<String> {
        parse_source(self.title.as_deref()?)
    }

    pub fn languages(&self) -> Vec<&'static str> {
        self.title.as_deref().map(parse_languages).unwrap_or_default()
    }

    pub fn video_codec(&self) -> Option<&'static str> {
        let text = self.title_and_filename();
        if ["hevc", "x265", "h.265", "h265"].iter().any(|t| text.contains(t)) {
            Some("HEVC")
        } else if ["x264", "h.264", "h264"].iter().any(|t| text.contains(t)) {
            Some("H.264")
        } else if text.contains("av1") {
            Some("AV1")
        } else {
            None
        }
    }

    pub fn audio_codec(&self) -> Option<&'static str> {
        let text = self.title_and_filename();
        if text.contains("truehd") && text.contains("atmos") {
            Some("TrueHD Atmos")
        } else if text.contains("truehd") {
            Some("TrueHD")
        } else if text.contains("dts-hd ma") || text.contains("dts-hd.ma") {
            Some("DTS-HD MA")
        } else if text.contains("dts") {
            Some("DTS")
        } else if ["dolby digital", "dd5.1", "ac3"].iter().any(|t| text.contains(t)) {
            Some("AC3")
        } else if text.contains("aac") {
            Some("AAC")
        } else {
            None
        }
    }

    pub fn is_remux(&self) -> bool {
        self.title_and_filename().contains("remux")
    }

    pub fn is_web_dl(&self) -> bool {
        let text = self.title_and_filename();
        text.contains("web-dl") || text.contains("webdl")
    }

    pub fn is_bluray(&self) -> bool {
        let text = self.title_and_filename();
        text.contains("bluray") || text.contains("blu-ray") || text.contains("bdrip")
    }

    fn title_and_name(&self) -> String {
        format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }

    fn title_and_filename(&self) -> String {
        format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.filename().unwrap_or_default()
        )
        .to_lowercase()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.display_title();
        write!(
            f,
            "[{}] {} 👤{} {}",
            self.resolution(),
            self.file_size().unwrap_or_else(|| "? GB".to_string()),
            self.seeders().unwrap_or(0),
            title.lines().next().unwrap_or(title)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBehaviorHints {
    #[serde(default)]
    pub binge_group: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub video_hash: Option<String>,
    #[serde(default)]
    pub video_size: Option<u64>,
    #[serde(default)]
    pub not_web_ready: Option<bool>,
    #[serde(default)]
    pub country_whitelist: Option<Vec<String>>,
    #[serde(default)]
    pub proxy_headers: Option<ProxyHeaders>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyHeaders {
    #[serde(default)]
    pub request: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub response: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

// -----------------------------------------------------------------------------
// Title token parsing
// -----------------------------------------------------------------------------

/// Seeders from "👤 142", "👤 1.2k" or "seeds: 500"
pub fn parse_seeders(title: &str) -> Option<u32> {
    let re = regex::Regex::new(r"👤\s*(\d+(?:\.\d+)?)\s*([kK])?").ok()?;
    if let Some(caps) = re.captures(title) {
        let num: f32 = caps.get(1)?.as_str().parse().ok()?;
        let multiplier = if caps.get(2).is_some() { 1000.0 } else { 1.0 };
        return Some((num * multiplier).round() as u32);
    }

    let re_seeds = regex::Regex::new(r"seeds?:\s*(\d+)").ok()?;
    let lower = title.to_lowercase();
    let caps = re_seeds.captures(&lower)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Size in bytes from "4.2 GB", "890 MB" and friends (binary units)
pub fn parse_size(title: &str) -> Option<u64> {
    let re = regex::Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(TB|GB|MB|KB)\b").ok()?;
    let caps = re.captures(title)?;
    let num: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_uppercase();

    let multiplier = match unit.as_str() {
        "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "MB" => 1024.0 * 1024.0,
        "KB" => 1024.0,
        _ => return None,
    };

    Some((num * multiplier) as u64)
}

/// Size label following the 💾 token
pub fn parse_size_label(title: &str) -> Option<String> {
    let re = regex::Regex::new(r"💾\s?([\d.]+ [KMGT]B)").ok()?;
    let caps = re.captures(title)?;
    Some(caps.get(1)?.as_str().trim().to_string())
}

/// Indexer name following the ⚙️ token
pub fn parse_source(title: &str) -> Option<String> {
    let re = regex::Regex::new(r"⚙\u{FE0F}?\s?(\w+)").ok()?;
    let caps = re.captures(title)?;
    Some(caps.get(1)?.as_str().to_string())
}

const LANGUAGE_FLAGS: &[(&str, &str)] = &[
    ("🇬🇧", "English"),
    ("🇮🇹", "Italian"),
    ("🇫🇷", "French"),
    ("🇩🇪", "German"),
    ("🇪🇸", "Spanish"),
    ("🇷🇺", "Russian"),
    ("🇯🇵", "Japanese"),
    ("🇰🇷", "Korean"),
    ("🇨🇳", "Chinese"),
];

/// Audio languages from flag emoji, plus "Multi" for multi-audio releases
pub fn parse_languages(title: &str) -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = LANGUAGE_FLAGS
        .iter()
        .filter(|(flag, _)| title.contains(flag))
        .map(|(_, lang)| *lang)
        .collect();

    if title.contains("🇧🇷") || title.contains("🇵🇹") {
        langs.push("Portuguese");
    }
    if title.to_lowercase().contains("multi") {
        langs.push("Multi");
    }

    langs
}

// =============================================================================
// Library Models
// =============================================================================

/// Resume point for a movie or an episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchProgress {
    /// `item_id`, or `item_id:episode_id` for episodes
    pub id: String,

    pub item_id: String,
    pub item_type: ContentType,
    pub item_name: String,
    pub item_poster: Option<String>,

    pub episode_id: Option<String>,
    pub episode_season: Option<u32>,
    pub episode_number: Option<u32>,
    pub episode_name: Option<String>,
    pub episode_thumbnail: Option<String>,

    /// Seconds
    pub current_time: f64,
    /// Seconds
    pub total_time: f64,
    pub stream_url: String,
    pub last_watched: DateTime<Utc>,
}

impl WatchProgress {
    pub fn new(
        item: &MediaItem,
        episode: Option<&Episode>,
        current_time: f64,
        total_time: f64,
        stream_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::progress_id(&item.id, episode.map(|e| e.id.as_str())),
            item_id: item.id.clone(),
            item_type: item.content_type.clone(),
            item_name: item.name.clone(),
            item_poster: item.poster.clone(),
            episode_id: episode.map(|e| e.id.clone()),
            episode_season: episode.map(|e| e.season),
            episode_number: episode.map(|e| e.effective_number()),
            episode_name: episode.and_then(|e| e.name.clone()),
            episode_thumbnail: episode.and_then(|e| e.thumbnail.clone()),
            current_time,
            total_time,
            stream_url: stream_url.into(),
            last_watched: Utc::now(),
        }
    }

    pub fn progress_id(item_id: &str, episode_id: Option<&str>) -> String {
        match episode_id {
            Some(episode_id) => format!("{}:{}", item_id, episode_id),
            None => item_id.to_string(),
        }
    }

    /// Seconds left, never negative
    pub fn remaining_time(&self) -> f64 {
        (self.total_time - self.current_time).max(0.0)
    }

    /// Fraction watched in `0.0..=1.0`
    pub fn progress_percentage(&self) -> f64 {
        if self.total_time <= 0.0 {
            return 0.0;
        }
        (self.current_time / self.total_time).clamp(0.0, 1.0)
    }

    pub fn remaining_time_formatted(&self) -> String {
        let remaining = self.remaining_time() as u64;
        let hours = remaining / 3600;
        let minutes = (remaining % 3600) / 60;

        if hours > 0 {
            format!("{}h {}m left", hours, minutes)
        } else if minutes > 0 {
            format!("{} min left", minutes)
        } else {
            "Less than 1 min left".to_string()
        }
    }

    /// Episode still for series, poster otherwise
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.episode_thumbnail
            .as_deref()
            .or(self.item_poster.as_deref())
    }

    pub fn display_title(&self) -> String {
        match (self.episode_season, self.episode_number) {
            (Some(season), Some(number)) => format!("S{} E{}", season, number),
            _ => self.item_name.clone(),
        }
    }

    pub fn is_movie(&self) -> bool {
        self.item_type == ContentType::Movie
    }

    pub fn is_series(&self) -> bool {
        self.item_type == ContentType::Series
    }

    /// Within the last minute of the runtime
    pub fn is_nearly_finished(&self) -> bool {
        self.remaining_time() < 60.0
    }
}

impl fmt::Display for WatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {:.0}% ({})",
            self.display_title(),
            self.progress_percentage() * 100.0,
            self.remaining_time_formatted()
        )
    }
}

/// A title the user starred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    pub poster: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl From<&MediaItem> for FavoriteItem {
    fn from(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            content_type: item.content_type.clone(),
            name: item.name.clone(),
            poster: item.poster.clone(),
            added_at: Utc::now(),
        }
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

fn join_names(names: Option<&[String]>) -> Option<String> {
    match names {
        Some(names) if !names.is_empty() => Some(names.join(", ")),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Accepts `8.1`, `"8.1"`, `""` and `null`; unparseable strings become `None`
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    Ok(
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::Text(s)) => s.trim().parse().ok(),
            None => None,
        },
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(json: &str) -> Stream {
        serde_json::from_str(json).unwrap()
    }

    fn titled(title: &str) -> Stream {
        Stream {
            name: None,
            title: Some(title.to_string()),
            url: None,
            info_hash: None,
            file_idx: None,
            sources: None,
            behavior_hints: None,
            description: None,
            subtitles: None,
            external_url: None,
            local_id: Uuid::new_v4(),
        }
    }

    // -------------------------------------------------------------------------
    // ContentType Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_content_type_serde() {
        let parsed: ContentType = serde_json::from_str("\"series\"").unwrap();
        assert_eq!(parsed, ContentType::Series);

        let other: ContentType = serde_json::from_str("\"channel\"").unwrap();
        assert_eq!(other, ContentType::Other("channel".into()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"channel\"");
        assert_eq!(serde_json::to_string(&ContentType::Movie).unwrap(), "\"movie\"");
    }

    // -------------------------------------------------------------------------
    // MediaItem Tests
    // -------------------------------------------------------------------------

    const SERIES_META: &str = r#"{
        "id": "tt0903747",
        "type": "series",
        "name": "Breaking Bad",
        "imdb_id": "tt0903747",
        "poster": "https://img/poster.jpg",
        "background": "https://img/bg.jpg",
        "genre": ["Crime", "Drama"],
        "cast": ["Bryan Cranston", "Aaron Paul"],
        "director": [],
        "released": "2008-01-20T00:00:00.000Z",
        "popularity": "12.5",
        "videos": [
            {"id": "tt0903747:2:1", "name": "Seven Thirty-Seven", "season": 2, "number": 1, "rating": "8.6"},
            {"id": "tt0903747:1:1", "title": "Pilot", "season": 1, "number": 1, "thumbnail": "https://img/s1e1.jpg", "rating": 9.0},
            {"id": "tt0903747:1:2", "season": 1, "number": 2, "episode": 2, "overview": "Cat's in the bag"},
            {"id": "tt0903747:0:1", "season": 0, "number": 1, "rating": ""}
        ]
    }"#;

    #[test]
    fn test_media_item_decodes_cinemeta_shape() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        assert!(item.is_series());
        assert_eq!(item.imdb_id.as_deref(), Some("tt0903747"));
        assert_eq!(item.popularity, Some(12.5));
        assert_eq!(item.all_genres(), ["Crime".to_string(), "Drama".to_string()]);
        assert_eq!(item.cast_string().as_deref(), Some("Bryan Cranston, Aaron Paul"));
        assert_eq!(item.director_string(), None);
        assert!(item.released_date().is_some());
    }

    #[test]
    fn test_episodes_grouped_by_season() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        assert_eq!(item.seasons(), vec![0, 1, 2]);

        let by_season = item.episodes_by_season();
        let season_one: Vec<&str> = by_season[&1].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(season_one, vec!["tt0903747:1:1", "tt0903747:1:2"]);
        assert_eq!(by_season[&1][0].name.as_deref(), Some("Pilot"));
    }

    #[test]
    fn test_episode_rating_lenient() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        let videos = item.videos.unwrap();
        assert_eq!(videos[0].rating, Some(8.6));
        assert_eq!(videos[1].rating, Some(9.0));
        assert_eq!(videos[2].rating, None);
        assert_eq!(videos[3].rating, None);
    }

    #[test]
    fn test_artwork_fallback_chain() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        let videos = item.videos.clone().unwrap();

        assert_eq!(item.artwork(Some(&videos[1])), Some("https://img/s1e1.jpg"));
        assert_eq!(item.artwork(Some(&videos[0])), Some("https://img/bg.jpg"));
        assert_eq!(item.artwork(None), Some("https://img/bg.jpg"));

        let mut bare = MediaItem::new("tt1", ContentType::Movie, "Bare");
        bare.poster = Some("https://img/p.jpg".into());
        assert_eq!(bare.artwork(None), Some("https://img/p.jpg"));
        bare.poster = None;
        assert_eq!(bare.artwork(None), None);
    }

    #[test]
    fn test_display_title_movie_vs_episode() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        let videos = item.videos.clone().unwrap();
        assert_eq!(item.display_title(None), "Breaking Bad");
        assert_eq!(item.display_title(Some(&videos[1])), "Breaking Bad - S1 E1 - Pilot");
        assert_eq!(item.display_title(Some(&videos[2])), "Breaking Bad - S1 E2");
    }

    #[test]
    fn test_media_item_display() {
        let mut item = MediaItem::new("tt1375666", ContentType::Movie, "Inception");
        assert_eq!(item.to_string(), "Inception [movie]");
        item.year = Some("2010".into());
        assert_eq!(item.to_string(), "Inception (2010) [movie]");
    }

    // -------------------------------------------------------------------------
    // Episode Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_episode_effective_number() {
        let mut ep: Episode =
            serde_json::from_str(r#"{"id": "x:1:5", "season": 1, "number": 5, "episode": 7}"#)
                .unwrap();
        assert_eq!(ep.effective_number(), 7);
        ep.episode = None;
        assert_eq!(ep.effective_number(), 5);
    }

    #[test]
    fn test_episode_key_and_label() {
        let ep: Episode = serde_json::from_str(
            r#"{"id": "x:3:4", "season": 3, "number": 4, "description": "d", "overview": "o"}"#,
        )
        .unwrap();
        assert_eq!(
            ep.key("tt1"),
            EpisodeKey {
                parent_id: "tt1".into(),
                season: 3,
                number: 4
            }
        );
        assert_eq!(ep.label(), "S3 E4");
        assert_eq!(ep.display_description(), Some("d"));
        assert_eq!(ep.to_string(), "S03E04");
    }

    // -------------------------------------------------------------------------
    // Quality Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_quality_from_str_loose() {
        assert_eq!(Quality::from_str_loose("Torrentio\n4k"), Quality::UHD4K);
        assert_eq!(Quality::from_str_loose("Movie.2160p.HDR"), Quality::UHD4K);
        assert_eq!(Quality::from_str_loose("Torrentio\n1080p"), Quality::FHD1080p);
        assert_eq!(Quality::from_str_loose("720p"), Quality::HD720p);
        assert_eq!(Quality::from_str_loose("480p"), Quality::SD480p);
        assert_eq!(Quality::from_str_loose("Movie HDR"), Quality::Unknown);
        assert_eq!(Quality::from_str_loose("HDCAM"), Quality::Unknown);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(Quality::UHD4K > Quality::FHD1080p);
        assert!(Quality::FHD1080p > Quality::HD720p);
        assert!(Quality::HD720p > Quality::SD480p);
        assert!(Quality::SD480p > Quality::Unknown);
    }

    #[test]
    fn test_quality_display() {
        assert_eq!(Quality::UHD4K.to_string(), "4K");
        assert_eq!(Quality::Unknown.to_string(), "???");
        assert_eq!(Quality::Unknown.badge(), "");
    }

    #[test]
    fn test_hdr_type() {
        assert_eq!(HdrType::from_str_loose("Movie.2160p.DV.HDR.mkv"), HdrType::DvHdr);
        assert_eq!(HdrType::from_str_loose("Movie Dolby Vision"), HdrType::DolbyVision);
        assert_eq!(HdrType::from_str_loose("Movie.HDR10+.x265"), HdrType::Hdr10Plus);
        assert_eq!(HdrType::from_str_loose("Movie.HDR.x265"), HdrType::Hdr10);
        assert_eq!(HdrType::from_str_loose("Movie.DVDRip"), HdrType::Sdr);
    }

    // -------------------------------------------------------------------------
    // Stream Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_stream_id_prefers_info_hash() {
        let s = stream(r#"{"infoHash": "abc", "url": "http://x"}"#);
        assert_eq!(s.id(), "abc");

        let s = stream(r#"{"url": "http://x"}"#);
        assert_eq!(s.id(), "http://x");
    }

    #[test]
    fn test_stream_generated_ids_never_collide() {
        let a = stream(r#"{"name": "Same"}"#);
        let b = stream(r#"{"name": "Same"}"#);
        assert_ne!(a.id(), b.id());
        // stable for one value
        assert_eq!(a.id(), a.id());
    }

    #[test]
    fn test_torrentio_title_parsing() {
        let s = stream(
            r#"{
                "name": "Torrentio\n4k DV | HDR",
                "title": "Dune.Part.Two.2024.2160p.WEB-DL.DDP5.1.Atmos.DV.HDR.H.265\n👤 46 💾 6.91 GB ⚙️ ThePirateBay\nMulti Audio / 🇬🇧 / 🇮🇹",
                "infoHash": "deadbeef",
                "fileIdx": 0,
                "behaviorHints": {"bingeGroup": "torrentio|4k", "filename": "Dune.Part.Two.mkv"}
            }"#,
        );

        assert_eq!(s.resolution(), Quality::UHD4K);
        assert_eq!(s.quality_badge(), "4K");
        assert_eq!(s.hdr_type(), HdrType::DvHdr);
        assert_eq!(s.seeders(), Some(46));
        assert_eq!(s.file_size().as_deref(), Some("6.91 GB"));
        assert_eq!(s.source().as_deref(), Some("ThePirateBay"));
        assert_eq!(s.languages(), vec!["English", "Italian", "Multi"]);
        assert_eq!(s.video_codec(), Some("HEVC"));
        assert!(s.is_web_dl());
        assert!(!s.is_remux());
        assert_eq!(s.binge_group(), Some("torrentio|4k"));
    }

    #[test]
    fn test_resolution_falls_back_to_name() {
        let s = stream(r#"{"name": "Torrentio\n1080p", "title": "Some.Movie.WEB"}"#);
        assert_eq!(s.resolution(), Quality::FHD1080p);
    }

    #[test]
    fn test_size_bytes_prefers_hint() {
        let s = stream(r#"{"title": "💾 1 GB", "behaviorHints": {"videoSize": 1234}}"#);
        assert_eq!(s.size_bytes(), Some(1234));
        let s = stream(r#"{"title": "💾 1 GB"}"#);
        assert_eq!(s.size_bytes(), Some(1024 * 1024 * 1024));
    }

    #[test]
    fn test_parse_seeders() {
        assert_eq!(parse_seeders("The.Batman.2022 👤 142"), Some(142));
        assert_eq!(parse_seeders("Some.Movie 👤142"), Some(142));
        assert_eq!(parse_seeders("Popular 👤 1.2k"), Some(1200));
        assert_eq!(parse_seeders("Movie seeds: 500"), Some(500));
        assert_eq!(parse_seeders("Movie Seed: 123"), Some(123));
        assert_eq!(parse_seeders("Movie.Without.Seeds.Info"), None);
    }

    #[test]
    fn test_parse_size() {
        let bytes = parse_size("The.Batman.2022.4.2 GB.mkv").unwrap();
        assert!((4_509_000_000..=4_510_000_000).contains(&bytes));
        assert_eq!(parse_size("Small.File.890 MB"), Some(890 * 1024 * 1024));
        assert_eq!(parse_size("tiny 2 kb"), Some(2048));
        assert!(parse_size("No.Size.Info.Here").is_none());
    }

    #[test]
    fn test_audio_codec_and_source_flags() {
        let s = titled("Movie.2019.1080p.BluRay.REMUX.TrueHD.Atmos.7.1");
        assert_eq!(s.audio_codec(), Some("TrueHD Atmos"));
        assert!(s.is_remux());
        assert!(s.is_bluray());
        assert_eq!(titled("Movie.x264.AAC").audio_codec(), Some("AAC"));
        assert_eq!(titled("Movie.x264.AAC").video_codec(), Some("H.264"));
        assert_eq!(titled("Movie.DTS-HD MA").audio_codec(), Some("DTS-HD MA"));
        assert_eq!(titled("Movie").audio_codec(), None);
    }

    #[test]
    fn test_magnet_url() {
        let s = stream(
            r#"{
                "infoHash": "abc123",
                "sources": ["tracker:udp://tracker.example:1337/announce", "dht:abc123"],
                "behaviorHints": {"filename": "The Batman (2022).mkv"}
            }"#,
        );
        assert_eq!(
            s.magnet_url().unwrap(),
            "magnet:?xt=urn:btih:abc123&dn=The%20Batman%20%282022%29.mkv&tr=udp%3A%2F%2Ftracker.example%3A1337%2Fannounce"
        );

        let direct = stream(r#"{"url": "https://cdn/video.mp4"}"#);
        assert!(direct.magnet_url().is_none());
    }

    #[test]
    fn test_stream_display() {
        let s = titled("Movie.1080p\n👤 12 💾 2.1 GB");
        assert_eq!(s.to_string(), "[1080p] 2.1 GB 👤12 Movie.1080p");
    }

    // -------------------------------------------------------------------------
    // WatchProgress Tests
    // -------------------------------------------------------------------------

    fn progress(current: f64, total: f64) -> WatchProgress {
        let item = MediaItem::new("tt1375666", ContentType::Movie, "Inception");
        WatchProgress::new(&item, None, current, total, "https://cdn/inception.mp4")
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress(30.0, 120.0).progress_percentage(), 0.25);
        assert_eq!(progress(10.0, 0.0).progress_percentage(), 0.0);
        assert_eq!(progress(200.0, 100.0).progress_percentage(), 1.0);
        assert_eq!(progress(200.0, 100.0).remaining_time(), 0.0);
    }

    #[test]
    fn test_remaining_time_formatted() {
        assert_eq!(progress(0.0, 5400.0).remaining_time_formatted(), "1h 30m left");
        assert_eq!(progress(0.0, 2700.0).remaining_time_formatted(), "45 min left");
        assert_eq!(progress(0.0, 30.0).remaining_time_formatted(), "Less than 1 min left");
    }

    #[test]
    fn test_nearly_finished() {
        assert!(progress(7150.0, 7200.0).is_nearly_finished());
        assert!(!progress(100.0, 7200.0).is_nearly_finished());
    }

    #[test]
    fn test_progress_for_episode() {
        let item: MediaItem = serde_json::from_str(SERIES_META).unwrap();
        let videos = item.videos.clone().unwrap();
        let p = WatchProgress::new(&item, Some(&videos[1]), 60.0, 3000.0, "u");

        assert_eq!(p.id, "tt0903747:tt0903747:1:1");
        assert_eq!(p.display_title(), "S1 E1");
        assert_eq!(p.thumbnail_url(), Some("https://img/s1e1.jpg"));
        assert!(p.is_series());

        let movie = progress(1.0, 2.0);
        assert_eq!(movie.id, "tt1375666");
        assert_eq!(movie.display_title(), "Inception");
        assert_eq!(movie.thumbnail_url(), None);
        assert!(movie.is_movie());
    }

    #[test]
    fn test_favorite_from_media_item() {
        let mut item = MediaItem::new("tt1", ContentType::Series, "Show");
        item.poster = Some("p".into());
        let fav = FavoriteItem::from(&item);
        assert_eq!(fav.id, "tt1");
        assert_eq!(fav.content_type, ContentType::Series);
        assert_eq!(fav.poster.as_deref(), Some("p"));
    }
}
