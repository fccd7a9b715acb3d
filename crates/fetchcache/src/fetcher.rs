//! # Fetcher
//!
//! Resolves a [`ResourceRequest`] to bytes: served from the disk cache when
//! an entry exists, otherwise fetched over HTTP with progress reporting and
//! persisted once the whole body has arrived.
//!
//! Concurrent resolutions of the same URL are not coordinated. On a cache
//! miss each of them fetches; the first to finish publishes the entry and
//! the others' writes are skipped.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{FutureExt, StreamExt};
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::DiskCache;
use crate::decoder::Decoder;
use crate::error::FetchError;
use crate::eviction::{EvictionSink, TaskScheduler, TokioScheduler, eviction_task};
use crate::progress::{ProgressEvent, ProgressReporter, ProgressSink};
use crate::request::ResourceRequest;
use crate::transport::{BoxBodyStream, HttpTransport, ReqwestTransport};
use crate::FetcherConfig;

/// Upper bound on buffer pre-allocation taken from `Content-Length`.
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    cache: DiskCache,
    base_url: Option<Url>,
    eviction_sink: Option<Arc<dyn EvictionSink>>,
    scheduler: Arc<dyn TaskScheduler>,
}

/// A load running on the tokio runtime.
///
/// `progress` yields events while the network fetch is in flight and ends
/// once the load has finished, whatever its outcome.
pub struct ResourceLoad<T> {
    pub progress: mpsc::UnboundedReceiver<ProgressEvent>,
    pub result: JoinHandle<Result<T, FetchError>>,
}

impl<T> ResourceLoad<T> {
    /// Wait for the load to complete, discarding any pending progress.
    pub async fn finish(self) -> Result<T, FetchError> {
        match self.result.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Load task did not complete");
                Err(FetchError::Cancelled)
            }
        }
    }
}

impl Fetcher {
    /// Create a fetcher with its own reqwest transport built from `config`.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a fetcher that uses the given transport.
    pub fn with_transport(config: &FetcherConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            cache: DiskCache::from_config(&config.cache_config),
            base_url: config.base_url.clone(),
            eviction_sink: None,
            scheduler: Arc::new(TokioScheduler),
        }
    }

    /// Notify `sink` whenever a load fails.
    pub fn with_eviction_sink(mut self, sink: Arc<dyn EvictionSink>) -> Self {
        self.eviction_sink = Some(sink);
        self
    }

    /// Use `scheduler` to defer eviction signals.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Turn an identifier into the absolute URI that will be requested.
    pub fn resolve_uri(&self, identifier: &str) -> Result<Url, FetchError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(identifier),
            None => Url::parse(identifier),
        };
        parsed.map_err(|e| FetchError::InvalidUrl(format!("{identifier}: {e}")))
    }

    /// Resolve `request` to its raw bytes.
    ///
    /// A non-empty cache entry is returned without any network activity or
    /// progress events. Otherwise the resource is fetched once, `progress`
    /// receives an event per received chunk, and a non-empty body is written
    /// to the cache before being returned. Failing to persist is logged and
    /// does not fail the call.
    ///
    /// This does not signal eviction; see [`fetch_and_decode`](Self::fetch_and_decode).
    #[instrument(skip(self, request, progress), fields(identifier = request.identifier()), level = "debug")]
    pub async fn resolve(
        &self,
        request: &ResourceRequest,
        progress: &dyn ProgressSink,
    ) -> Result<Bytes, FetchError> {
        let key = request.cache_key();

        match self.cache.read(&key).await {
            Ok(Some(data)) if !data.is_empty() => {
                debug!(key = %key, size = data.len(), "Serving resource from cache");
                return Ok(data);
            }
            Ok(Some(_)) => debug!(key = %key, "Cached entry is empty, treating as miss"),
            Ok(None) => debug!(key = %key, "Cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, treating as miss"),
        }

        let uri = self.resolve_uri(request.identifier())?;
        let headers = request.header_map()?;

        info!(url = %uri, "Fetching resource");
        let response = self.transport.get(&uri, headers).await?;

        if response.status != StatusCode::OK {
            Self::drain(response.body, &uri).await;
            return Err(FetchError::NetworkStatus {
                status: response.status,
                uri,
            });
        }

        let data = Self::consolidate(response.body, response.content_length, progress).await?;

        if data.is_empty() {
            return Err(FetchError::EmptyPayload { uri });
        }

        match self.cache.write_if_absent(&key, &data).await {
            Ok(true) => debug!(key = %key, size = data.len(), "Cached fetched resource"),
            Ok(false) => {}
            Err(e) => warn!(url = %uri, error = %e, "Failed to cache fetched resource"),
        }

        debug!(url = %uri, size = data.len(), "Fetched resource");
        Ok(data)
    }

    /// Resolve `request` and decode the bytes with `decoder`.
    ///
    /// Any failure, including a decode failure or a panic inside the
    /// decoder, schedules exactly one eviction signal for the request on the
    /// configured scheduler.
    pub async fn fetch_and_decode<D: Decoder>(
        &self,
        request: &ResourceRequest,
        decoder: &D,
        progress: &dyn ProgressSink,
    ) -> Result<D::Output, FetchError> {
        let attempt = async {
            let bytes = self.resolve(request, progress).await?;
            decoder.decode(bytes).map_err(FetchError::Decode)
        };
        let result = match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(FetchError::Panicked(panic_message(payload.as_ref()))),
        };

        if let Err(e) = &result {
            warn!(identifier = request.identifier(), error = %e, "Failed to load resource");
            self.schedule_eviction(request);
        }

        result
    }

    /// Spawn a full load of `request` on the tokio runtime.
    pub fn load<D: Decoder>(&self, request: ResourceRequest, decoder: D) -> ResourceLoad<D::Output> {
        let (mut reporter, progress) = ProgressReporter::channel();
        let fetcher = self.clone();

        let result = tokio::spawn(async move {
            let result = fetcher
                .fetch_and_decode(&request, &decoder, &reporter)
                .await;
            reporter.close();
            result
        });

        ResourceLoad { progress, result }
    }

    fn schedule_eviction(&self, request: &ResourceRequest) {
        if let Some(sink) = &self.eviction_sink {
            self.scheduler
                .schedule(eviction_task(sink.clone(), request.clone()));
        }
    }

    /// Read the body to the end so the connection can be reused.
    async fn drain(mut body: BoxBodyStream, uri: &Url) {
        let mut drained = 0usize;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => drained += chunk.len(),
                Err(e) => {
                    debug!(url = %uri, error = %e, "Error while draining response body");
                    return;
                }
            }
        }
        debug!(url = %uri, bytes = drained, "Drained response body");
    }

    async fn consolidate(
        mut body: BoxBodyStream,
        expected: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> Result<Bytes, FetchError> {
        let capacity = expected.unwrap_or(0).min(MAX_PREALLOC) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut loaded = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            loaded += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);
            progress.on_progress(ProgressEvent {
                bytes_loaded: loaded,
                bytes_expected: expected,
            });
        }

        Ok(buffer.freeze())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::decoder::RawDecoder;
    use crate::eviction::BoxTask;
    use crate::progress::NoProgress;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use futures::stream;
    use parking_lot::Mutex;
    use reqwest::header::HeaderMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::task::Poll;
    use tempfile::TempDir;

    #[inline]
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    const URL_A: &str = "https://example.com/a.png";
    const URL_MISSING: &str = "https://example.com/missing.png";

    enum Reply {
        Body {
            status: StatusCode,
            chunks: Vec<Result<Bytes, FetchError>>,
            content_length: Option<u64>,
        },
        Fail,
    }

    struct StubTransport {
        reply: Reply,
        calls: AtomicUsize,
        urls: Mutex<Vec<Url>>,
        headers: Mutex<Vec<HeaderMap>>,
        drained: Arc<AtomicBool>,
    }

    impl StubTransport {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
                headers: Mutex::new(Vec::new()),
                drained: Arc::new(AtomicBool::new(false)),
            })
        }

        fn ok(chunks: &[&'static [u8]], content_length: Option<u64>) -> Arc<Self> {
            Self::new(Reply::Body {
                status: StatusCode::OK,
                chunks: chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect(),
                content_length,
            })
        }

        fn status(status: StatusCode, body: &'static [u8]) -> Arc<Self> {
            Self::new(Reply::Body {
                status,
                chunks: vec![Ok(Bytes::from_static(body))],
                content_length: Some(body.len() as u64),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn get(
            &self,
            url: &Url,
            headers: HeaderMap,
        ) -> Result<TransportResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.clone());
            self.headers.lock().push(headers);

            match &self.reply {
                Reply::Fail => Err(FetchError::Transport("connection refused".into())),
                Reply::Body {
                    status,
                    chunks,
                    content_length,
                } => {
                    let items: Vec<Result<Bytes, FetchError>> = chunks
                        .iter()
                        .map(|c| match c {
                            Ok(bytes) => Ok(bytes.clone()),
                            Err(_) => Err(FetchError::Transport("connection reset".into())),
                        })
                        .collect();
                    let drained = self.drained.clone();
                    let end = stream::poll_fn(move |_| {
                        drained.store(true, Ordering::SeqCst);
                        Poll::Ready(None)
                    });
                    Ok(TransportResponse {
                        status: *status,
                        content_length: *content_length,
                        body: stream::iter(items).chain(end).boxed(),
                    })
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<ResourceRequest>>);

    impl EvictionSink for RecordingSink {
        fn evict(&self, request: &ResourceRequest) {
            self.0.lock().push(request.clone());
        }
    }

    /// Queues tasks until the test runs them explicitly.
    #[derive(Default)]
    struct ManualScheduler(Mutex<Vec<BoxTask>>);

    impl ManualScheduler {
        fn pending(&self) -> usize {
            self.0.lock().len()
        }

        async fn run_pending(&self) {
            let tasks: Vec<BoxTask> = std::mem::take(&mut *self.0.lock());
            for task in tasks {
                task.await;
            }
        }
    }

    impl TaskScheduler for ManualScheduler {
        fn schedule(&self, task: BoxTask) {
            self.0.lock().push(task);
        }
    }

    struct Harness {
        dir: TempDir,
        fetcher: Fetcher,
        sink: Arc<RecordingSink>,
        scheduler: Arc<ManualScheduler>,
    }

    fn harness(transport: Arc<StubTransport>) -> Harness {
        harness_with(transport, |b| b)
    }

    fn harness_with(
        transport: Arc<StubTransport>,
        customize: impl FnOnce(crate::FetcherConfigBuilder) -> crate::FetcherConfigBuilder,
    ) -> Harness {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let config = customize(FetcherConfig::builder().with_cache_dir(dir.path())).build();
        let sink = Arc::new(RecordingSink::default());
        let scheduler = Arc::new(ManualScheduler::default());
        let fetcher = Fetcher::with_transport(&config, transport)
            .with_eviction_sink(sink.clone())
            .with_scheduler(scheduler.clone());
        Harness {
            dir,
            fetcher,
            sink,
            scheduler,
        }
    }

    fn entry_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0)
    }

    async fn resolve_collecting(
        fetcher: &Fetcher,
        request: &ResourceRequest,
    ) -> (Result<Bytes, FetchError>, Vec<ProgressEvent>) {
        let events = Mutex::new(Vec::new());
        let result = fetcher
            .resolve(request, &|event: ProgressEvent| events.lock().push(event))
            .await;
        (result, events.into_inner())
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_and_persists() {
        let transport = StubTransport::ok(&[b"0123", b"456789"], Some(10));
        let h = harness(transport.clone());
        let request = ResourceRequest::new(URL_A);

        let (result, events) = resolve_collecting(&h.fetcher, &request).await;
        let bytes = result.unwrap();

        assert_eq!(bytes, Bytes::from_static(b"0123456789"));
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            events,
            vec![
                ProgressEvent {
                    bytes_loaded: 4,
                    bytes_expected: Some(10)
                },
                ProgressEvent {
                    bytes_loaded: 10,
                    bytes_expected: Some(10)
                },
            ]
        );

        let path = h.dir.path().join(CacheKey::for_identifier(URL_A).as_str());
        assert_eq!(std::fs::read(path).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let transport = StubTransport::ok(&[b"unused"], None);
        let h = harness(transport.clone());
        std::fs::write(
            h.dir.path().join(CacheKey::for_identifier(URL_A).as_str()),
            b"0123456789",
        )
        .unwrap();

        let (result, events) = resolve_collecting(&h.fetcher, &ResourceRequest::new(URL_A)).await;

        assert_eq!(result.unwrap(), Bytes::from_static(b"0123456789"));
        assert_eq!(transport.calls(), 0);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_second_resolve_served_from_cache() {
        let transport = StubTransport::ok(&[b"abc", b"def"], Some(6));
        let h = harness(transport.clone());
        let request = ResourceRequest::new(URL_A);

        let first = h.fetcher.resolve(&request, &NoProgress).await.unwrap();
        let (second, events) = resolve_collecting(&h.fetcher, &request).await;

        assert_eq!(first, second.unwrap());
        assert_eq!(transport.calls(), 1);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached_and_is_drained() {
        let transport = StubTransport::status(StatusCode::NOT_FOUND, b"no such image");
        let h = harness(transport.clone());
        let request = ResourceRequest::new(URL_MISSING);

        let err = h
            .fetcher
            .fetch_and_decode(&request, &RawDecoder, &NoProgress)
            .await
            .unwrap_err();

        match err {
            FetchError::NetworkStatus { status, uri } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(uri.as_str(), URL_MISSING);
            }
            other => panic!("expected NetworkStatus, got {other:?}"),
        }
        assert!(transport.drained.load(Ordering::SeqCst));
        assert_eq!(entry_count(&h.dir), 0);

        // The eviction is deferred until the scheduler runs.
        assert!(h.sink.0.lock().is_empty());
        assert_eq!(h.scheduler.pending(), 1);
        h.scheduler.run_pending().await;
        assert_eq!(*h.sink.0.lock(), vec![request]);
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_a_failure() {
        let transport = StubTransport::status(StatusCode::NO_CONTENT, b"");
        let h = harness(transport);

        let err = h
            .fetcher
            .resolve(&ResourceRequest::new(URL_A), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::NetworkStatus { status, .. } if status == StatusCode::NO_CONTENT
        ));
    }

    #[tokio::test]
    async fn test_empty_body_fails_without_caching() {
        let transport = StubTransport::ok(&[], Some(0));
        let h = harness(transport);
        let request = ResourceRequest::new(URL_A);

        let err = h
            .fetcher
            .fetch_and_decode(&request, &RawDecoder, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyPayload { ref uri } if uri.as_str() == URL_A));
        assert_eq!(entry_count(&h.dir), 0);
        h.scheduler.run_pending().await;
        assert_eq!(h.sink.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cache_entry_is_a_miss() {
        let transport = StubTransport::ok(&[b"fresh"], Some(5));
        let h = harness(transport.clone());
        let path = h.dir.path().join(CacheKey::for_identifier(URL_A).as_str());
        std::fs::write(&path, b"").unwrap();

        let bytes = h
            .fetcher
            .resolve(&ResourceRequest::new(URL_A), &NoProgress)
            .await
            .unwrap();

        assert_eq!(bytes, Bytes::from_static(b"fresh"));
        assert_eq!(transport.calls(), 1);
        // Existing entries are never overwritten, even empty ones.
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_progress_without_content_length() {
        let transport = StubTransport::ok(&[b"ab", b"", b"cde", b"f"], None);
        let h = harness(transport);

        let (result, events) = resolve_collecting(&h.fetcher, &ResourceRequest::new(URL_A)).await;
        let bytes = result.unwrap();

        assert!(events.iter().all(|e| e.bytes_expected.is_none()));
        assert!(
            events
                .windows(2)
                .all(|w| w[0].bytes_loaded <= w[1].bytes_loaded)
        );
        assert_eq!(events.last().unwrap().bytes_loaded, bytes.len() as u64);
    }

    #[tokio::test]
    async fn test_headers_and_base_url() {
        let transport = StubTransport::ok(&[b"img"], Some(3));
        let h = harness_with(transport.clone(), |b| {
            b.with_base_url(Url::parse("https://cdn.example.com/images/").unwrap())
        });
        let request = ResourceRequest::new("icons/a.png")
            .with_header("X-Api-Key", "secret")
            .with_header("Accept", "image/png");

        h.fetcher.resolve(&request, &NoProgress).await.unwrap();

        assert_eq!(
            transport.urls.lock()[0].as_str(),
            "https://cdn.example.com/images/icons/a.png"
        );
        let headers = &transport.headers.lock()[0];
        assert_eq!(headers.get("x-api-key").unwrap(), "secret");
        assert_eq!(headers.get("accept").unwrap(), "image/png");
        // The key comes from the identifier as given, not the resolved URI.
        assert!(
            h.dir
                .path()
                .join(CacheKey::for_identifier("icons/a.png").as_str())
                .is_file()
        );
    }

    #[tokio::test]
    async fn test_relative_identifier_without_base_url() {
        let transport = StubTransport::ok(&[b"img"], Some(3));
        let h = harness(transport.clone());

        let err = h
            .fetcher
            .resolve(&ResourceRequest::new("a.png"), &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_header_fails_before_network() {
        let transport = StubTransport::ok(&[b"img"], Some(3));
        let h = harness(transport.clone());
        let request = ResourceRequest::new(URL_A).with_header("bad header", "x");

        let err = h.fetcher.resolve(&request, &NoProgress).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidHeader(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_schedules_single_eviction() {
        let transport = StubTransport::new(Reply::Fail);
        let h = harness(transport);
        let request = ResourceRequest::new(URL_A);

        let err = h
            .fetcher
            .fetch_and_decode(&request, &RawDecoder, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
        assert_eq!(h.scheduler.pending(), 1);
        h.scheduler.run_pending().await;
        h.scheduler.run_pending().await;
        assert_eq!(h.sink.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_body_is_never_cached() {
        let transport = StubTransport::new(Reply::Body {
            status: StatusCode::OK,
            chunks: vec![
                Ok(Bytes::from_static(b"part")),
                Err(FetchError::Transport("connection reset".into())),
            ],
            content_length: Some(100),
        });
        let h = harness(transport);

        let (result, events) = resolve_collecting(&h.fetcher, &ResourceRequest::new(URL_A)).await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
        assert_eq!(events.len(), 1);
        assert_eq!(entry_count(&h.dir), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_bytes() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let config = FetcherConfig::builder().with_cache_dir(&blocker).build();
        let transport = StubTransport::ok(&[b"payload"], Some(7));
        let fetcher = Fetcher::with_transport(&config, transport.clone());

        let bytes = fetcher
            .resolve(&ResourceRequest::new(URL_A), &NoProgress)
            .await
            .unwrap();

        assert_eq!(bytes, Bytes::from_static(b"payload"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_schedules_eviction() {
        let transport = StubTransport::ok(&[b"not an image"], Some(12));
        let h = harness(transport);
        let request = ResourceRequest::new(URL_A);
        let decoder = |_bytes: Bytes| -> Result<(), String> { Err("bad magic".to_string()) };

        let err = h
            .fetcher
            .fetch_and_decode(&request, &decoder, &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(ref e) if e.to_string() == "bad magic"));
        assert!(h.sink.0.lock().is_empty());
        h.scheduler.run_pending().await;
        assert_eq!(*h.sink.0.lock(), vec![request]);
    }

    #[tokio::test]
    async fn test_decoder_panic_fails_load_and_evicts() {
        let transport = StubTransport::ok(&[b"garbage"], Some(7));
        let h = harness(transport);
        let request = ResourceRequest::new(URL_A);
        let decoder = |_bytes: Bytes| -> Result<(), String> { panic!("decoder blew up") };

        let mut load = h.fetcher.load(request.clone(), decoder);
        while load.progress.recv().await.is_some() {}

        let err = load.finish().await.unwrap_err();
        assert!(matches!(err, FetchError::Panicked(ref msg) if msg == "decoder blew up"));
        assert_eq!(h.scheduler.pending(), 1);
        h.scheduler.run_pending().await;
        assert_eq!(*h.sink.0.lock(), vec![request]);
    }

    #[tokio::test]
    async fn test_success_schedules_nothing() {
        let transport = StubTransport::ok(&[b"abc"], Some(3));
        let h = harness(transport);

        let len = h
            .fetcher
            .fetch_and_decode(
                &ResourceRequest::new(URL_A),
                &|bytes: Bytes| -> Result<usize, String> { Ok(bytes.len()) },
                &NoProgress,
            )
            .await
            .unwrap();

        assert_eq!(len, 3);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_fetches() {
        let transport = StubTransport::ok(&[b"abc"], Some(3));
        let h = harness_with(transport.clone(), |b| b.with_caching_enabled(false));
        let request = ResourceRequest::new(URL_A);

        h.fetcher.resolve(&request, &NoProgress).await.unwrap();
        h.fetcher.resolve(&request, &NoProgress).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(entry_count(&h.dir), 0);
    }

    #[tokio::test]
    async fn test_load_streams_progress_and_closes() {
        let transport = StubTransport::ok(&[b"01234", b"56789"], Some(10));
        let h = harness(transport);

        let mut load = h.fetcher.load(ResourceRequest::new(URL_A), RawDecoder);
        let mut events = Vec::new();
        while let Some(event) = load.progress.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        assert_eq!(
            events.last().copied(),
            Some(ProgressEvent {
                bytes_loaded: 10,
                bytes_expected: Some(10)
            })
        );
        assert_eq!(load.finish().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_load_failure_closes_progress_and_evicts_later() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let config = FetcherConfig::builder().with_cache_dir(dir.path()).build();
        let sink = Arc::new(RecordingSink::default());
        let fetcher = Fetcher::with_transport(
            &config,
            StubTransport::status(StatusCode::NOT_FOUND, b"gone"),
        )
        .with_eviction_sink(sink.clone());

        let request = ResourceRequest::new(URL_MISSING);
        let mut load = fetcher.load(request.clone(), RawDecoder);

        assert_eq!(load.progress.recv().await, None);
        assert!(matches!(
            load.finish().await,
            Err(FetchError::NetworkStatus { .. })
        ));

        for _ in 0..20 {
            if !sink.0.lock().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(*sink.0.lock(), vec![request]);
    }
}
