//! Addon error types

use thiserror::Error;

/// Errors raised while talking to addons or aggregating their results
#[derive(Error, Debug)]
pub enum AddonError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode {what} from {url}: {source}")]
    Decode {
        what: &'static str,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode manifest from {url}: {source}")]
    ManifestDecode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Addon manifest not loaded")]
    ManifestNotLoaded,

    #[error("No addon found for {resource}/{content_type}")]
    NoAddonFound {
        resource: String,
        content_type: String,
    },
}

impl AddonError {
    /// True for transport failures and unexpected HTTP status codes
    pub fn is_request_failure(&self) -> bool {
        matches!(self, AddonError::Network { .. } | AddonError::Status { .. })
    }

    /// True for malformed response bodies, manifests included
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            AddonError::Decode { .. } | AddonError::ManifestDecode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_request_failure() {
        let err = AddonError::Status {
            url: "https://addon.test/stream/movie/tt1.json".into(),
            status: 503,
        };
        assert!(err.is_request_failure());
        assert!(!err.is_decode_failure());
        assert_eq!(
            err.to_string(),
            "Request to https://addon.test/stream/movie/tt1.json returned HTTP 503"
        );
    }

    #[test]
    fn test_decode_classification() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AddonError::ManifestDecode {
            url: "https://addon.test/manifest.json".into(),
            source,
        };
        assert!(err.is_decode_failure());
        assert!(!err.is_request_failure());
    }

    #[test]
    fn test_no_addon_found_message() {
        let err = AddonError::NoAddonFound {
            resource: "meta".into(),
            content_type: "movie".into(),
        };
        assert_eq!(err.to_string(), "No addon found for meta/movie");
    }
}
