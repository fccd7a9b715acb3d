//! # Fetchcache
//!
//! A library for fetching remote resources by URL and keeping them in a
//! local write-once disk cache, so that repeated requests for the same URL
//! are served without touching the network.
//!
//! ## Features
//!
//! - Deterministic cache keys derived from the resource URL
//! - Write-if-absent disk store with atomic publication of entries
//! - Streamed progress reporting while a fetch is in flight
//! - Caller-supplied decoding of the fetched bytes
//! - Deferred eviction signals to an external in-memory cache on failure
//! - Injectable HTTP transport for testing

pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod eviction;
pub mod fetcher;
pub mod progress;
pub mod proxy;
pub mod request;
pub mod transport;

pub use builder::FetcherConfigBuilder;
pub use cache::{CacheConfig, CacheKey, DiskCache};
pub use config::FetcherConfig;
pub use decoder::{Decoder, RawDecoder};
pub use error::FetchError;
pub use eviction::{EvictionSink, TaskScheduler, TokioScheduler};
pub use fetcher::{Fetcher, ResourceLoad};
pub use progress::{NoProgress, ProgressEvent, ProgressReporter, ProgressSink};
pub use request::ResourceRequest;
pub use transport::{BoxBodyStream, HttpTransport, ReqwestTransport, TransportResponse};

// Re-export client utilities
pub use client::create_client;

// Re-export proxy utilities
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
