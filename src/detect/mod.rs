pub mod changepoint;
pub mod window;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::queue::SampleQueue;
use crate::status::{ChangePointRecord, StatusCollector};
use crate::MIN_SAMPLE_COUNT;

pub use changepoint::detect;
pub use window::{trim_start, Window};

/// Minimum segment length handed to the change point function.
pub const SENSITIVITY: usize = 1;

/// Consumes samples from the queue and reports change points in the window.
pub struct WindowDetector {
    queue: Arc<SampleQueue>,
    status: Arc<StatusCollector>,
    window: Window,
    min_samples: usize,
}

impl WindowDetector {
    pub fn new(queue: Arc<SampleQueue>, status: Arc<StatusCollector>) -> Self {
        Self {
            queue,
            status,
            window: Window::new(),
            min_samples: MIN_SAMPLE_COUNT,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Run until `shutdown` is observed at the top of an iteration or the
    /// queue is closed while the window is filling.
    ///
    /// A wait on an empty queue is only interrupted by the queue closing.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(min_samples = self.min_samples, "detector started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            // ── Filling ────────────────────────────────────────────
            while self.window.len() < self.min_samples {
                match self.queue.pop().await {
                    Some(sample) => self.window.push(sample),
                    None => {
                        tracing::info!("sample queue closed, detector stopping");
                        return;
                    }
                }
            }

            // ── Detecting ──────────────────────────────────────────
            let (change_points, records) = self.detect_once();
            let start = self.window.trim(&change_points);
            self.status.record_detection(self.window.len(), &records);
            tracing::debug!(
                window_len = self.window.len(),
                trimmed = start,
                "window trimmed"
            );
        }

        tracing::info!("detector stopped");
    }

    /// One detection pass over the current window. Logs every change point
    /// and returns their indices, ascending, with their status records.
    fn detect_once(&self) -> (Vec<usize>, Vec<ChangePointRecord>) {
        let (values, timestamps) = self.window.split();
        let change_points = detect(&values, SENSITIVITY);

        let records: Vec<ChangePointRecord> = change_points
            .iter()
            .map(|&index| {
                tracing::info!(
                    index,
                    value = values[index],
                    timestamp = %timestamps[index],
                    "change point detected"
                );
                ChangePointRecord {
                    index,
                    value: values[index],
                    timestamp: timestamps[index],
                }
            })
            .collect();

        (change_points, records)
    }
}
