use tokio::sync::mpsc;

/// Progress of a single network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The number of bytes received so far.
    pub bytes_loaded: u64,
    /// The total number of bytes declared by the server (if known).
    pub bytes_expected: Option<u64>,
}

/// Receiver of progress events emitted while a resource is fetched.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Owning end of a progress channel.
///
/// The channel is closed when [`close`](Self::close) is called or when the
/// reporter is dropped, whichever comes first, so every exit path of the
/// task holding it terminates the stream seen by the receiver.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn close(&mut self) {
        self.tx.take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

impl ProgressSink for ProgressReporter {
    fn on_progress(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is listening; progress is advisory.
            let _ = tx.send(event);
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.close();
    }
}
