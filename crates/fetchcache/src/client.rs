use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{FetchError, FetcherConfig};

/// Create a reqwest Client with the provided configuration.
///
/// Automatic response decompression is always disabled: the fetcher sizes
/// its progress reports from `Content-Length`, which describes the bytes on
/// the wire, so the body must be delivered exactly as sent.
pub fn create_client(config: &FetcherConfig) -> Result<Client, FetchError> {
    let provider = Arc::new(ring::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::ClientBuild(format!("TLS protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| FetchError::ClientBuild(format!("platform verifier: {e}")))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .no_gzip()
        .no_deflate()
        .no_brotli()
        .no_zstd()
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.pool_idle_timeout.is_zero() {
        client_builder = client_builder.pool_idle_timeout(config.pool_idle_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        client_builder = client_builder.proxy(proxy_config.to_proxy()?);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy");
    } else if config.use_system_proxy {
        // reqwest picks up system proxy settings unless no_proxy() is called
        debug!("Using system proxy settings");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled");
    }

    client_builder.build().map_err(FetchError::from)
}
