//! Addon registry and aggregator
//!
//! Owns the active set of loaded addons and answers catalog, meta, stream and
//! search requests by routing them to every addon whose manifest declares
//! support, then merging the answers.
//!
//! Failures are isolated per addon: one addon timing out or returning garbage
//! only shrinks the merged result. The exception is [`AddonRegistry::fetch_meta`],
//! which has no partial answer and reports [`AddonError::NoAddonFound`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;

use super::addon::{http_client, AddonClient};
use super::error::AddonError;
use crate::models::{MediaItem, Stream};

/// Default per-request timeout for addon calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the registry is in its load cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
}

/// One addon's contribution to [`AddonRegistry::fetch_catalogs`]
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub addon_id: String,
    pub addon_name: String,
    pub catalog_id: String,
    pub catalog_name: String,
    pub items: Vec<MediaItem>,
}

#[derive(Debug)]
struct Registry {
    state: LoadState,
    addons: Vec<Arc<AddonClient>>,
}

/// The set of configured addons and the fan-out/merge logic over them
#[derive(Debug)]
pub struct AddonRegistry {
    client: reqwest::Client,
    inner: RwLock<Registry>,
}

impl AddonRegistry {
    /// Create an empty registry whose HTTP calls time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(http_client(timeout))
    }

    /// Create an empty registry on top of an existing HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            inner: RwLock::new(Registry {
                state: LoadState::Idle,
                addons: Vec::new(),
            }),
        }
    }

    pub async fn load_state(&self) -> LoadState {
        self.inner.read().await.state
    }

    /// True once a full load cycle finished, even if every addon failed
    pub async fn is_loaded(&self) -> bool {
        self.load_state().await == LoadState::Loaded
    }

    /// Snapshot of the active addons, in load order
    pub async fn addons(&self) -> Vec<Arc<AddonClient>> {
        self.inner.read().await.addons.clone()
    }

    /// Load every manifest concurrently and replace the active set
    ///
    /// Addons whose URL is invalid or whose manifest fails to load are logged
    /// and left out. The survivors keep the order of `urls`. Returns how many
    /// addons are active afterwards.
    pub async fn load_addons<S: AsRef<str>>(&self, urls: &[S]) -> usize {
        self.inner.write().await.state = LoadState::Loading;

        let loads = urls.iter().map(|url| async move {
            let url = url.as_ref();
            let addon = match AddonClient::new(url, self.client.clone()) {
                Ok(addon) => addon,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "skipping addon");
                    return None;
                }
            };

            match addon.load_manifest().await {
                Ok(manifest) => {
                    tracing::info!(
                        addon = %manifest.name,
                        resources = ?manifest.resource_names(),
                        "loaded addon"
                    );
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "failed to load addon");
                    return None;
                }
            }

            Some(Arc::new(addon))
        });

        let loaded: Vec<Arc<AddonClient>> = join_all(loads).await.into_iter().flatten().collect();
        let count = loaded.len();

        {
            let mut inner = self.inner.write().await;
            inner.addons = loaded;
            inner.state = LoadState::Loaded;
        }

        tracing::info!(loaded = count, configured = urls.len(), "addon load complete");
        count
    }

    /// Active addons whose manifest supports `resource` for `content_type`
    pub async fn addons_for(&self, resource: &str, content_type: &str) -> Vec<Arc<AddonClient>> {
        let matching: Vec<Arc<AddonClient>> = self
            .addons()
            .await
            .into_iter()
            .filter(|addon| addon.supports(resource, content_type))
            .collect();

        tracing::debug!(
            resource,
            content_type,
            addons = ?matching.iter().map(|a| a.name()).collect::<Vec<_>>(),
            "matched addons"
        );
        matching
    }

    /// First catalog of `content_type` from every catalog addon
    ///
    /// Addons that declare several catalogs of the type contribute only the
    /// first one. Failing addons are left out of the result.
    pub async fn fetch_catalogs(&self, content_type: &str) -> Vec<CatalogResult> {
        let addons = self.addons_for("catalog", content_type).await;

        let fetches = addons
            .iter()
            .filter_map(|addon| {
                let first = addon
                    .catalogs_for(content_type)
                    .ok()
                    .and_then(|catalogs| catalogs.into_iter().next());
                if first.is_none() {
                    tracing::debug!(addon = addon.name(), content_type, "no catalogs for type");
                }
                first.map(|catalog| (addon, catalog))
            })
            .map(|(addon, catalog)| async move {
                match addon.fetch_catalog(content_type, &catalog.id, &[]).await {
                    Ok(items) => {
                        tracing::debug!(
                            addon = addon.name(),
                            count = items.len(),
                            "catalog fetched"
                        );
                        Some(CatalogResult {
                            addon_id: addon.id().to_string(),
                            addon_name: addon.name().to_string(),
                            catalog_id: catalog.id.clone(),
                            catalog_name: catalog.display_name(),
                            items,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(addon = addon.name(), error = %e, "catalog fetch failed");
                        None
                    }
                }
            });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Meta from the first addon, in load order, that answers successfully
    pub async fn fetch_meta(&self, content_type: &str, id: &str) -> Result<MediaItem, AddonError> {
        for addon in self.addons_for("meta", content_type).await {
            match addon.fetch_meta(content_type, id).await {
                Ok(meta) => return Ok(meta),
                Err(e) => {
                    tracing::warn!(addon = addon.name(), error = %e, "meta fetch failed");
                }
            }
        }

        Err(AddonError::NoAddonFound {
            resource: "meta".to_string(),
            content_type: content_type.to_string(),
        })
    }

    /// Streams from every stream addon, concatenated in addon order
    ///
    /// Never fails: addons that error are skipped, and if all of them do the
    /// result is simply empty.
    pub async fn fetch_streams(&self, content_type: &str, id: &str) -> Vec<Stream> {
        let addons = self.addons_for("stream", content_type).await;

        let fetches = addons.iter().map(|addon| async move {
            match addon.fetch_streams(content_type, id).await {
                Ok(streams) => {
                    tracing::debug!(addon = addon.name(), count = streams.len(), "streams fetched");
                    streams
                }
                Err(e) => {
                    tracing::warn!(addon = addon.name(), error = %e, "stream fetch failed");
                    Vec::new()
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Query every searchable catalog of `content_type`, deduplicated by id
    ///
    /// Results are concatenated in (addon, catalog) order; the first item seen
    /// for an id wins and later duplicates are dropped.
    pub async fn search_catalogs(&self, content_type: &str, query: &str) -> Vec<MediaItem> {
        let addons = self.addons_for("catalog", content_type).await;

        let searches = addons
            .iter()
            .flat_map(|addon| {
                addon
                    .catalogs_for(content_type)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|catalog| catalog.supports_search())
                    .map(move |catalog| (addon, catalog))
            })
            .map(|(addon, catalog)| async move {
                tracing::debug!(addon = addon.name(), catalog = %catalog.id, query, "searching");
                match addon
                    .fetch_catalog(content_type, &catalog.id, &[("search", query)])
                    .await
                {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::warn!(addon = addon.name(), error = %e, "search failed");
                        Vec::new()
                    }
                }
            });

        let results = join_all(searches).await.into_iter().flatten().collect();
        dedupe_by_id(results)
    }
}

impl Default for AddonRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Stable dedupe: keeps the first item for each id, order preserved
pub fn dedupe_by_id(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn item(id: &str) -> MediaItem {
        MediaItem::new(id, ContentType::Movie, format!("Movie {}", id))
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut second = item("2");
        second.name = "Second copy".into();

        let merged = dedupe_by_id(vec![item("1"), item("2"), second, item("3")]);
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(merged[1].name, "Movie 2");
    }

    #[tokio::test]
    async fn test_new_registry_is_idle_and_empty() {
        let registry = AddonRegistry::default();
        assert_eq!(registry.load_state().await, LoadState::Idle);
        assert!(!registry.is_loaded().await);
        assert!(registry.addons().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_fan_outs() {
        let registry = AddonRegistry::default();
        assert!(registry.fetch_catalogs("movie").await.is_empty());
        assert!(registry.fetch_streams("movie", "tt1").await.is_empty());
        assert!(registry.search_catalogs("movie", "matrix").await.is_empty());
        assert!(matches!(
            registry.fetch_meta("movie", "tt1").await,
            Err(AddonError::NoAddonFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_with_only_invalid_urls_still_completes() {
        let registry = AddonRegistry::default();
        let count = registry.load_addons(&["not a url", ""]).await;
        assert_eq!(count, 0);
        assert!(registry.is_loaded().await);
    }
}
