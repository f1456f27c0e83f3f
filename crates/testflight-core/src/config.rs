//! Client configuration.

use std::time::Duration;

/// Production App Store Connect API root.
pub const DEFAULT_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1/";

/// App Store Connect client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root every relative path is joined onto (always ends with `/`)
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP transport
    pub timeout: Duration,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: normalize_base_url(
                &std::env::var("APP_STORE_CONNECT_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ),
            timeout: Duration::from_secs(60),
            user_agent: format!("testflight-publish/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
