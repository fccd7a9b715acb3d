//! # Builder for FetcherConfig
//!
//! Fluent construction of [`FetcherConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fetchcache_engine::FetcherConfig;
//!
//! let config = FetcherConfig::builder()
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_user_agent("MyApp/1.0")
//!     .with_header("X-Api-Key", "my-secret-key")
//!     .with_cache_dir("/tmp/my-cache")
//!     .build();
//!
//! assert_eq!(config.user_agent, "MyApp/1.0");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::warn;
use url::Url;

use crate::{CacheConfig, FetcherConfig, proxy::ProxyConfig};

/// Builder for creating FetcherConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.config.cache_config = cache_config;
        self
    }

    /// Root the disk cache at `path` instead of the system temp directory
    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_config.disk_cache_path = Some(path.into());
        self
    }

    /// Enable or disable caching
    pub fn with_caching_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_config.enabled = enabled;
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a default HTTP header. Invalid names or values are logged and ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            (Ok(header_name), Ok(header_value)) => {
                self.config.headers.insert(header_name, header_value);
            }
            _ => warn!(name = name.as_ref(), "Ignoring invalid default header"),
        }
        self
    }

    /// Set all default HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Set the proxy configuration
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false; // Explicit proxy overrides system proxy
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        // Only set system proxy if no explicit proxy is configured
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl Default for FetcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
