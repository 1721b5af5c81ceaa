//! Command-line flags and the option container handed to the scraper.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::logging::LoggingConfig;

/// CLI arguments for the detector.
#[derive(Parser, Debug)]
#[command(name = "mad", version)]
#[command(about = "Scrape one time series and report change points in its values")]
pub struct CliArgs {
    /// Interval in seconds at which the endpoint is scraped. Must be greater than 0.
    #[arg(long, default_value_t = 1, env = "MAD_SCRAPE_INTERVAL")]
    pub scrape_interval: u64,

    /// Instant vector selector for the series to track, e.g. 'foo{bar="baz"}'.
    /// If several series in a scrape match, the first one is used.
    #[arg(long, env = "MAD_TIME_SERIES_SELECTOR")]
    pub time_series_selector: String,

    /// URL of the endpoint exposing metrics in the text exposition format.
    /// Blank lines and lines starting with '#' are ignored.
    #[arg(long, env = "MAD_ENDPOINT")]
    pub endpoint: String,

    /// Maximum number of scrape payloads being searched at once. With 1,
    /// samples are enqueued in scrape order.
    #[arg(long, default_value_t = 1, env = "MAD_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// Serve run statistics over HTTP on this address, e.g. 127.0.0.1:9100
    #[arg(long, env = "MAD_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "MAD_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl CliArgs {
    pub fn options(&self) -> Options {
        Options {
            scrape_interval: Duration::from_secs(self.scrape_interval),
            time_series_selector: self.time_series_selector.clone(),
            endpoint: self.endpoint.clone(),
            max_in_flight: self.max_in_flight,
            listen_address: self.listen_address,
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::default().with_json_format(self.log_format == LogFormat::Json)
    }
}

/// Options the pipeline is built from. Validated by
/// [`Scraper::new`](crate::scrape::Scraper::new), not here.
#[derive(Debug, Clone)]
pub struct Options {
    pub scrape_interval: Duration,
    pub time_series_selector: String,
    pub endpoint: String,
    pub max_in_flight: usize,
    pub listen_address: Option<SocketAddr>,
}

impl Options {
    pub fn new(
        scrape_interval: Duration,
        time_series_selector: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            scrape_interval,
            time_series_selector: time_series_selector.into(),
            endpoint: endpoint.into(),
            max_in_flight: 1,
            listen_address: None,
        }
    }
}
