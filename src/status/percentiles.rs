use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Latency percentiles (µs) for the scrape fetches seen so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p99_us: u64,
    pub count: u64,
}

impl LatencyPercentiles {
    /// Zeroed when nothing has been recorded yet.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min_us: hist.min(),
            max_us: hist.max(),
            mean_us: hist.mean(),
            p50_us: hist.value_at_quantile(0.50),
            p90_us: hist.value_at_quantile(0.90),
            p99_us: hist.value_at_quantile(0.99),
            count: hist.len(),
        }
    }

    pub fn empty() -> Self {
        Self {
            min_us: 0,
            max_us: 0,
            mean_us: 0.0,
            p50_us: 0,
            p90_us: 0,
            p99_us: 0,
            count: 0,
        }
    }
}
