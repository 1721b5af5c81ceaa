//! Metrics anomaly detector.
//!
//! Scrapes one series from a text exposition endpoint at a fixed interval and
//! logs change points in its values.
//!
//! ```text
//! Scraper (tick → GET → search) ──push──▶ SampleQueue ──pop──▶ WindowDetector (detect → trim)
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod queue;
pub mod scrape;
pub mod server;
pub mod status;

pub use config::{CliArgs, Options};
pub use detect::{detect, WindowDetector};
pub use error::{ConfigError, FetchError, ParseError, QueueClosed, SearchError};
pub use pipeline::{Pipeline, PipelineError};
pub use queue::{Sample, SampleQueue};
pub use scrape::{Scraper, Selector};
pub use status::StatusCollector;

/// Samples needed before the first detection pass. Also the queue capacity.
pub const MIN_SAMPLE_COUNT: usize = 1 << 5;
