//! Single-addon client
//!
//! Talks to one addon over the Stremio addon protocol, starting from its
//! manifest URL:
//!
//! - `GET <manifest url>` → manifest
//! - `GET <base>/catalog/<type>/<id>[/<extra>].json` → `{ "metas": [...] }`
//! - `GET <base>/meta/<type>/<id>.json` → `{ "meta": {...} }`
//! - `GET <base>/stream/<type>/<id>.json` → `{ "streams": [...] }`

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::error::AddonError;
use super::manifest::{Manifest, ManifestCatalog};
use crate::models::{MediaItem, Stream};

// =============================================================================
// Response Envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    metas: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    meta: MediaItem,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    streams: Vec<Stream>,
}

/// Which status codes count as a usable response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusPolicy {
    /// Any 2xx
    Success,
    /// Exactly 200
    OkOnly,
}

impl StatusPolicy {
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            StatusPolicy::Success => status.is_success(),
            StatusPolicy::OkOnly => status == StatusCode::OK,
        }
    }
}

/// Shared HTTP client for addon calls, with a per-request timeout
///
/// If the builder fails the default client is used and the failure is logged,
/// since requests then run without a timeout.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "HTTP client setup failed; requests have no timeout");
            reqwest::Client::default()
        })
}

// =============================================================================
// Addon Client
// =============================================================================

/// Client for one addon, identified by its manifest URL
///
/// Created unloaded. [`AddonClient::load_manifest`] fetches the manifest once;
/// later calls (concurrent ones included) reuse the cached value.
#[derive(Debug)]
pub struct AddonClient {
    manifest_url: Url,
    base_url: String,
    manifest: OnceCell<Manifest>,
    client: reqwest::Client,
}

impl AddonClient {
    /// Create a client sharing the given HTTP connection pool
    pub fn new(manifest_url: &str, client: reqwest::Client) -> Result<Self, AddonError> {
        let rewritten = rewrite_stremio_scheme(manifest_url.trim());
        let manifest_url =
            Url::parse(&rewritten).map_err(|_| AddonError::InvalidUrl(rewritten.clone()))?;
        let base_url = derive_base_url(&manifest_url)?;

        Ok(Self {
            manifest_url,
            base_url,
            manifest: OnceCell::new(),
            client,
        })
    }

    /// Create a client with its own HTTP client (mostly for tests)
    pub fn with_manifest_url(manifest_url: &str) -> Result<Self, AddonError> {
        Self::new(manifest_url, reqwest::Client::new())
    }

    pub fn manifest_url(&self) -> &str {
        self.manifest_url.as_str()
    }

    /// Manifest URL minus the manifest file, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Manifest id once loaded, else the manifest URL
    pub fn id(&self) -> &str {
        self.manifest
            .get()
            .map(|m| m.id.as_str())
            .unwrap_or_else(|| self.manifest_url.as_str())
    }

    pub fn name(&self) -> &str {
        self.manifest
            .get()
            .map(|m| m.name.as_str())
            .unwrap_or("Unknown Addon")
    }

    pub fn is_loaded(&self) -> bool {
        self.manifest.initialized()
    }

    pub fn manifest(&self) -> Result<&Manifest, AddonError> {
        self.manifest.get().ok_or(AddonError::ManifestNotLoaded)
    }

    /// False until the manifest is loaded
    pub fn supports(&self, resource: &str, content_type: &str) -> bool {
        self.manifest
            .get()
            .map_or(false, |m| m.supports(resource, content_type))
    }

    pub fn catalogs_for(&self, content_type: &str) -> Result<Vec<&ManifestCatalog>, AddonError> {
        Ok(self.manifest()?.catalogs_for(content_type))
    }

    /// Fetch and cache the manifest; idempotent
    pub async fn load_manifest(&self) -> Result<&Manifest, AddonError> {
        self.manifest
            .get_or_try_init(|| async {
                let url = self.manifest_url.as_str();
                let body = self.get_text(url, StatusPolicy::Success).await?;
                serde_json::from_str::<Manifest>(&body).map_err(|source| {
                    AddonError::ManifestDecode {
                        url: url.to_string(),
                        source,
                    }
                })
            })
            .await
    }

    /// Fetch one catalog page
    ///
    /// `extra` pairs are appended as the path segment `k=v&k=v`, values
    /// percent-encoded. `skip=0` is added unless `search` or `skip` is given.
    pub async fn fetch_catalog(
        &self,
        content_type: &str,
        catalog_id: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<MediaItem>, AddonError> {
        let url = catalog_url(&self.base_url, content_type, catalog_id, extra)?;
        tracing::debug!(addon = self.name(), %url, "fetching catalog");

        let response: CatalogResponse = self
            .get_json(url.as_str(), "catalog", StatusPolicy::Success)
            .await?;
        Ok(response.metas)
    }

    /// Fetch the full meta record for one item
    pub async fn fetch_meta(
        &self,
        content_type: &str,
        id: &str,
    ) -> Result<MediaItem, AddonError> {
        let url = resource_url(&self.base_url, "meta", content_type, id)?;
        let response: MetaResponse = self
            .get_json(url.as_str(), "meta", StatusPolicy::Success)
            .await?;
        Ok(response.meta)
    }

    /// Fetch stream candidates; anything but HTTP 200 is a failure
    pub async fn fetch_streams(
        &self,
        content_type: &str,
        id: &str,
    ) -> Result<Vec<Stream>, AddonError> {
        let url = resource_url(&self.base_url, "stream", content_type, id)?;
        let response: StreamResponse = self
            .get_json(url.as_str(), "streams", StatusPolicy::OkOnly)
            .await?;
        Ok(response.streams)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &'static str,
        policy: StatusPolicy,
    ) -> Result<T, AddonError> {
        let body = self.get_text(url, policy).await?;
        serde_json::from_str(&body).map_err(|source| AddonError::Decode {
            what,
            url: url.to_string(),
            source,
        })
    }

    async fn get_text(&self, url: &str, policy: StatusPolicy) -> Result<String, AddonError> {
        let network = |source| AddonError::Network {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !policy.accepts(status) {
            return Err(AddonError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(network)
    }
}

// =============================================================================
// URL Helpers
// =============================================================================

const STREMIO_SCHEME: &str = "stremio://";

/// `stremio://host/manifest.json` → `https://host/manifest.json`
///
/// Schemes are case-insensitive, so `STREMIO://` is rewritten too.
pub fn rewrite_stremio_scheme(url: &str) -> String {
    match url.get(..STREMIO_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(STREMIO_SCHEME) => {
            format!("https://{}", &url[STREMIO_SCHEME.len()..])
        }
        _ => url.to_string(),
    }
}

/// Drop the manifest file segment (and a trailing slash after it), query and fragment
fn derive_base_url(manifest_url: &Url) -> Result<String, AddonError> {
    let mut base = manifest_url.clone();
    base.path_segments_mut()
        .map_err(|_| AddonError::InvalidUrl(manifest_url.to_string()))?
        .pop_if_empty()
        .pop();
    base.set_query(None);
    base.set_fragment(None);
    Ok(base.as_str().trim_end_matches('/').to_string())
}

/// Build `<base>/catalog/<type>/<id>[/<extra>].json`
pub fn catalog_url(
    base_url: &str,
    content_type: &str,
    catalog_id: &str,
    extra: &[(&str, &str)],
) -> Result<Url, AddonError> {
    let mut params: Vec<(&str, &str)> = extra.to_vec();
    let has_key = |key: &str| extra.iter().any(|(k, _)| *k == key);
    if !has_key("search") && !has_key("skip") {
        params.push(("skip", "0"));
    }

    let mut url = format!("{}/catalog/{}/{}", base_url, content_type, catalog_id);
    if !params.is_empty() {
        let extra_path = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.push('/');
        url.push_str(&extra_path);
    }
    url.push_str(".json");

    Url::parse(&url).map_err(|_| AddonError::InvalidUrl(url))
}

/// Build `<base>/<resource>/<type>/<id>.json`
fn resource_url(
    base_url: &str,
    resource: &str,
    content_type: &str,
    id: &str,
) -> Result<Url, AddonError> {
    let url = format!("{}/{}/{}/{}.json", base_url, resource, content_type, id);
    Url::parse(&url).map_err(|_| AddonError::InvalidUrl(url))
}
