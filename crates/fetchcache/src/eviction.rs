//! # Eviction
//!
//! A failed resolution must tell the external in-memory cache to drop the
//! request's entry. That cache registers a request only after starting the
//! load, so the signal is never delivered inline: it is handed to a
//! [`TaskScheduler`] and runs on a later turn of the runtime.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::request::ResourceRequest;

/// A unit of deferred work.
pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The external cache that is told to forget requests whose load failed.
pub trait EvictionSink: Send + Sync + 'static {
    fn evict(&self, request: &ResourceRequest);
}

/// Runs deferred work after the current unit of work has finished.
pub trait TaskScheduler: Send + Sync + 'static {
    fn schedule(&self, task: BoxTask);
}

/// Default scheduler: spawns the task on the tokio runtime and yields once
/// before running it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TaskScheduler for TokioScheduler {
    fn schedule(&self, task: BoxTask) {
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            task.await;
        });
    }
}

/// Build the task that delivers one eviction signal for `request`.
pub(crate) fn eviction_task<S>(sink: std::sync::Arc<S>, request: ResourceRequest) -> BoxTask
where
    S: EvictionSink + ?Sized,
{
    Box::pin(async move {
        debug!(identifier = request.identifier(), "Evicting failed request");
        sink.evict(&request);
    })
}
