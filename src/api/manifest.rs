//! Addon manifest model
//!
//! A manifest is the addon's self-description: which resources it serves
//! (`catalog`, `meta`, `stream`, ...), for which content types, and which
//! catalogs it exposes. It decides whether an addon is queried at all.

use serde::{Deserialize, Serialize};

/// Decoded `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    pub resources: Vec<ManifestResource>,
    pub types: Vec<String>,
    #[serde(default)]
    pub catalogs: Vec<ManifestCatalog>,
    #[serde(default)]
    pub id_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub behavior_hints: Option<ManifestBehaviorHints>,
}

impl Manifest {
    /// Does this addon serve `resource` for content of type `content_type`?
    ///
    /// The resource entry must match by name and either carry no type
    /// restriction or list the type; the top-level `types` must list it too.
    pub fn supports(&self, resource: &str, content_type: &str) -> bool {
        let has_resource = self.resources.iter().any(|res| match res {
            ManifestResource::Simple(name) => name == resource,
            ManifestResource::Detailed(detail) => {
                detail.name == resource
                    && detail
                        .types
                        .as_ref()
                        .map_or(true, |types| types.iter().any(|t| t == content_type))
            }
        });

        has_resource && self.types.iter().any(|t| t == content_type)
    }

    /// Catalogs declared for a content type, in manifest order
    pub fn catalogs_for(&self, content_type: &str) -> Vec<&ManifestCatalog> {
        self.catalogs
            .iter()
            .filter(|c| c.content_type == content_type)
            .collect()
    }

    /// Declared resource names, in manifest order
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(ManifestResource::name).collect()
    }

    pub fn is_adult(&self) -> bool {
        self.behavior_hints
            .as_ref()
            .and_then(|h| h.adult)
            .unwrap_or(false)
    }

    pub fn requires_configuration(&self) -> bool {
        self.behavior_hints
            .as_ref()
            .and_then(|h| h.configuration_required)
            .unwrap_or(false)
    }
}

/// A resource is either a bare name (`"catalog"`) or a detailed object
///
/// Untagged: the string shape is tried first, then the object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestResource {
    Simple(String),
    Detailed(ManifestResourceDetail),
}

impl ManifestResource {
    pub fn name(&self) -> &str {
        match self {
            ManifestResource::Simple(name) => name,
            ManifestResource::Detailed(detail) => &detail.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResourceDetail {
    pub name: String,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub id_prefixes: Option<Vec<String>>,
}

/// A catalog listing declared in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestCatalog {
    #[serde(rename = "type")]
    pub content_type: String,
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub extra: Option<Vec<CatalogExtra>>,
    #[serde(default)]
    pub extra_supported: Option<Vec<String>>,
    #[serde(default)]
    pub extra_required: Option<Vec<String>>,
}

impl ManifestCatalog {
    /// Declared name, else the id with each word capitalized
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => capitalize_words(&self.id),
        }
    }

    /// Whether the catalog accepts a `search` extra parameter
    pub fn supports_search(&self) -> bool {
        // The legacy `extraSupported` list wins; `extra` descriptors are the fallback
        if let Some(supported) = &self.extra_supported {
            if supported.iter().any(|e| e == "search") {
                return true;
            }
        }
        self.extra
            .as_ref()
            .map_or(false, |extra| extra.iter().any(|e| e.name == "search"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogExtra {
    pub name: String,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestBehaviorHints {
    #[serde(default)]
    pub adult: Option<bool>,
    #[serde(default)]
    pub p2p: Option<bool>,
    #[serde(default)]
    pub configurable: Option<bool>,
    #[serde(default)]
    pub configuration_required: Option<bool>,
}

fn capitalize_words(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
