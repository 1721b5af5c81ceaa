use reqwest::StatusCode;
use thiserror::Error;

use crate::queue::Sample;

// ─── Startup ─────────────────────────────────────────────────────

/// Invalid configuration. Always fatal, raised before any scraping starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scrape interval must be greater than 0")]
    InvalidInterval,

    #[error("time series selector must be set")]
    EmptySelector,

    #[error("could not parse time series selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The selector parsed, but into something other than an instant
    /// vector selector (e.g. a range vector, a scalar or an aggregation).
    #[error("time series selector {selector:?} must be an instant vector selector, got {found}")]
    NotInstantVector { selector: String, found: &'static str },

    #[error("endpoint must be set")]
    EmptyEndpoint,

    #[error("{endpoint:?} must be a valid URL: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{endpoint:?} must use the http or https scheme")]
    UnsupportedScheme { endpoint: String },

    #[error("max in-flight parse tasks must be greater than 0")]
    InvalidInFlightLimit,
}

// ─── Scraping ────────────────────────────────────────────────────

/// A failed scrape. Terminates the scrape loop; there is no retry.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not GET {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("expected status code {expected} from {url}, got {status}", expected = StatusCode::OK)]
    Status { url: String, status: StatusCode },

    #[error("could not read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The line matched the target series but its sample descriptor is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected 1 value, got {count}: {line:?}")]
    ValueCount { count: usize, line: String },

    #[error("could not parse sample value {token:?}: {line:?}")]
    InvalidValue { token: String, line: String },
}

/// Outcome of searching a line (or a whole payload) that did not yield a value.
///
/// Only `Parse` is an actual failure; the other two tell the caller to keep
/// scanning (`VectorTypeMismatch`) or that the scan is over (`TargetNotFound`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("vector type mismatch: {token:?}")]
    VectorTypeMismatch { token: String },

    #[error("search target not found")]
    TargetNotFound,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

// ─── Queue ───────────────────────────────────────────────────────

/// Returned by a push against a closed queue; hands the sample back.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("sample queue is closed")]
pub struct QueueClosed(pub Sample);
