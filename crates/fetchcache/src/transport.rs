//! # HTTP Transport
//!
//! The seam between the fetcher and the network. The default
//! [`ReqwestTransport`] wraps a single pooled reqwest client; tests and
//! embedders substitute their own implementation.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::{FetchError, FetcherConfig, client::create_client};

/// A type alias for a boxed response body stream
pub type BoxBodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// Status line, declared length and streaming body of an HTTP response.
pub struct TransportResponse {
    pub status: StatusCode,
    /// The `Content-Length` declared by the server, if any
    pub content_length: Option<u64>,
    pub body: BoxBodyStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET for `url` with the given extra headers.
    async fn get(&self, url: &Url, headers: HeaderMap) -> Result<TransportResponse, FetchError>;
}

/// Transport backed by a shared reqwest [`Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with a client created from `config`.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Wrap an existing client. The caller is responsible for disabling
    /// automatic decompression on it.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: HeaderMap) -> Result<TransportResponse, FetchError> {
        debug!(url = %url, "Sending GET request");
        let response = self.client.get(url.clone()).headers(headers).send().await?;

        let status = response.status();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(FetchError::from))
            .boxed();

        Ok(TransportResponse {
            status,
            content_length,
            body,
        })
    }
}
