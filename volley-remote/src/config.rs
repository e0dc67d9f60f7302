//! Remote store configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP remote store adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL for the document API (e.g., "https://api.volley.gg/v1").
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.volley.gg/v1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    /// Config pointed at a local mock server.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: base_url.into(),
            ..Self::default()
        }
    }
}
