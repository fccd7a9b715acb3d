use reqwest::Proxy;

use crate::error::FetchError;

/// Proxy configuration types
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProxyType {
    /// Proxy plain HTTP traffic only
    Http,
    /// Proxy HTTPS traffic only
    Https,
    /// SOCKS5 proxy for all traffic
    Socks5,
    /// HTTP proxy for all traffic
    All,
}

/// Proxy authentication type
#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    /// Build the reqwest proxy matching this configuration.
    pub fn to_proxy(&self) -> Result<Proxy, FetchError> {
        let invalid = |e: reqwest::Error| FetchError::Proxy(format!("{}: {e}", self.url));

        let mut proxy = match self.proxy_type {
            ProxyType::Http => Proxy::http(&self.url).map_err(invalid)?,
            ProxyType::Https => Proxy::https(&self.url).map_err(invalid)?,
            ProxyType::Socks5 => {
                let url = if self.url.starts_with("socks5://") || self.url.starts_with("socks5h://")
                {
                    self.url.clone()
                } else {
                    format!("socks5://{}", self.url)
                };
                Proxy::all(&url).map_err(invalid)?
            }
            ProxyType::All => Proxy::all(&self.url).map_err(invalid)?,
        };

        if let Some(auth) = &self.auth {
            proxy = proxy.basic_auth(&auth.username, &auth.password);
        }

        Ok(proxy)
    }
}
