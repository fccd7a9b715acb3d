use fetchcache_engine::ProgressEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            multi,
            disabled: true,
        }
    }

    /// Drive a bar for one load until its progress channel closes.
    ///
    /// The channel must always be drained, even when bars are disabled, so
    /// the load never buffers events nobody reads.
    pub async fn follow(&self, label: &str, mut events: UnboundedReceiver<ProgressEvent>) {
        if self.disabled {
            while events.recv().await.is_some() {}
            return;
        }

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(download_style());
        bar.set_message(format!("Fetching {label}"));
        bar.enable_steady_tick(Duration::from_millis(500));

        while let Some(event) = events.recv().await {
            if let Some(total) = event.bytes_expected {
                bar.set_length(total);
            }
            bar.set_position(event.bytes_loaded);
        }

        bar.finish_with_message(format!("Finished {label}"));
    }

    #[inline]
    #[allow(unused)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
