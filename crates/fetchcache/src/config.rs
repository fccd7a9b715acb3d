use std::time::Duration;

use reqwest::header::HeaderMap;
use url::Url;

use crate::{CacheConfig, proxy::ProxyConfig};

const DEFAULT_USER_AGENT: &str = concat!("fetchcache/", env!("CARGO_PKG_VERSION"));

/// Configurable options for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Cache configuration
    pub cache_config: CacheConfig,

    /// Base URI that relative identifiers are resolved against
    pub base_url: Option<Url>,

    /// Overall timeout for the entire HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (zero disables it)
    pub connect_timeout: Duration,

    /// How long idle pooled connections are kept (zero keeps the reqwest default)
    pub pool_idle_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Headers sent with every request; per-request headers take precedence
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_config: CacheConfig::default(),
            base_url: None,
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::ZERO,
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HeaderMap::new(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

impl FetcherConfig {
    pub fn builder() -> crate::builder::FetcherConfigBuilder {
        crate::builder::FetcherConfigBuilder::new()
    }
}
