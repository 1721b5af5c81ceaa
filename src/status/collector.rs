use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::percentiles::LatencyPercentiles;

// ─── Configuration ───────────────────────────────────────────────

/// How many change points we keep for the status feed
const MAX_RECENT_CHANGE_POINTS: usize = 200;

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe run statistics.
/// The scraper and detector record into it, the status endpoint reads
/// snapshots.
pub struct StatusCollector {
    inner: Mutex<Inner>,
}

/// A change point as reported by one detection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePointRecord {
    /// Index into the window the pass ran over
    pub index: usize,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Read-only view shipped to the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: f64,

    // Scraper
    pub scrapes_total: u64,
    pub samples_total: u64,
    pub targets_missing_total: u64,
    pub parse_errors_total: u64,
    pub fetch_latency: LatencyPercentiles,

    // Detector
    pub detections_total: u64,
    pub window_len: usize,
    pub change_points_total: u64,
    pub recent_change_points: Vec<ChangePointRecord>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    started_at: DateTime<Utc>,
    start_instant: Instant,

    fetch_hist: Histogram<u64>,
    scrapes_total: u64,
    samples_total: u64,
    targets_missing_total: u64,
    parse_errors_total: u64,

    detections_total: u64,
    window_len: usize,
    change_points_total: u64,
    recent_change_points: VecDeque<ChangePointRecord>,
}

// ─── StatusCollector impl ────────────────────────────────────────

impl StatusCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// A completed fetch and how long it took.
    pub fn record_fetch(&self, elapsed: Duration) {
        let mut inner = self.inner.lock();
        inner.scrapes_total += 1;
        let us = (elapsed.as_micros() as u64).clamp(HIST_LOW, HIST_HIGH);
        let _ = inner.fetch_hist.record(us);
    }

    /// A sample was found and enqueued.
    pub fn record_sample(&self) {
        self.inner.lock().samples_total += 1;
    }

    /// A payload without the target series.
    pub fn record_target_missing(&self) {
        self.inner.lock().targets_missing_total += 1;
    }

    pub fn record_parse_error(&self) {
        self.inner.lock().parse_errors_total += 1;
    }

    /// One detection pass; `window_len` is what the window kept after trimming.
    pub fn record_detection(&self, window_len: usize, change_points: &[ChangePointRecord]) {
        self.inner.lock().record_detection(window_len, change_points);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for StatusCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            start_instant: Instant::now(),
            fetch_hist: Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                .expect("histogram creation"),
            scrapes_total: 0,
            samples_total: 0,
            targets_missing_total: 0,
            parse_errors_total: 0,
            detections_total: 0,
            window_len: 0,
            change_points_total: 0,
            recent_change_points: VecDeque::with_capacity(MAX_RECENT_CHANGE_POINTS + 1),
        }
    }

    fn record_detection(&mut self, window_len: usize, change_points: &[ChangePointRecord]) {
        self.detections_total += 1;
        self.window_len = window_len;
        self.change_points_total += change_points.len() as u64;

        for record in change_points {
            self.recent_change_points.push_back(record.clone());
            if self.recent_change_points.len() > MAX_RECENT_CHANGE_POINTS {
                self.recent_change_points.pop_front();
            }
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            started_at: self.started_at,
            uptime_secs: self.start_instant.elapsed().as_secs_f64(),

            scrapes_total: self.scrapes_total,
            samples_total: self.samples_total,
            targets_missing_total: self.targets_missing_total,
            parse_errors_total: self.parse_errors_total,
            fetch_latency: LatencyPercentiles::from_histogram(&self.fetch_hist),

            detections_total: self.detections_total,
            window_len: self.window_len,
            change_points_total: self.change_points_total,
            recent_change_points: self.recent_change_points.iter().cloned().collect(),
        }
    }
}
