use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

use crate::error::QueueClosed;

/// A single observation of the target series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    value: f64,
}

impl Sample {
    /// Stamp `value` with the current wall-clock time.
    pub fn now(value: f64) -> Self {
        Self::at(Utc::now(), value)
    }

    pub fn at(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

// ─── SampleQueue ─────────────────────────────────────────────────

/// Bounded FIFO between the scraper's parse tasks and the detector.
///
/// `push` waits while the queue is full and `pop` waits while it is empty.
/// Once closed, `push` fails and `pop` returns `None` straight away, even if
/// samples are still buffered.
pub struct SampleQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    not_empty: Notify,
    not_full: Notify,
}

struct Inner {
    samples: VecDeque<Sample>,
    closed: bool,
}

impl SampleQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                samples: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Append a sample, waiting for room if the queue is full.
    pub async fn push(&self, sample: Sample) -> Result<(), QueueClosed> {
        loop {
            // Register interest before inspecting state so a wakeup issued
            // between the check and the await is not lost.
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueClosed(sample));
                }
                if inner.samples.len() < self.capacity {
                    inner.samples.push_back(sample);
                    let room_left = inner.samples.len() < self.capacity;
                    drop(inner);

                    self.not_empty.notify_one();
                    if room_left {
                        // Pass the baton to any other producer still waiting.
                        self.not_full.notify_one();
                    }
                    return Ok(());
                }
            }

            notified.await;
        }
    }

    /// Remove the oldest sample, waiting while the queue is empty.
    /// Returns `None` once the queue is closed.
    pub async fn pop(&self) -> Option<Sample> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return None;
                }
                if let Some(sample) = inner.samples.pop_front() {
                    let more_left = !inner.samples.is_empty();
                    drop(inner);

                    self.not_full.notify_one();
                    if more_left {
                        self.not_empty.notify_one();
                    }
                    return Some(sample);
                }
            }

            notified.await;
        }
    }

    /// Close the queue and wake every waiter on both sides.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
