//! Wires the scraper, the sample queue, the detector and the optional status
//! endpoint together under one shutdown token.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Options;
use crate::detect::WindowDetector;
use crate::error::{ConfigError, FetchError};
use crate::queue::SampleQueue;
use crate::scrape::Scraper;
use crate::server;
use crate::status::StatusCollector;
use crate::MIN_SAMPLE_COUNT;

/// Why a pipeline run ended unsuccessfully.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not bind status endpoint to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("status endpoint failed: {0}")]
    Server(#[from] std::io::Error),

    #[error("{task} task panicked")]
    Panicked { task: &'static str },
}

/// A validated, not yet running pipeline.
pub struct Pipeline {
    scraper: Scraper,
    detector: WindowDetector,
    status: Arc<StatusCollector>,
    options: Options,
}

impl Pipeline {
    /// Validate `options` and build every component. Fails before any network
    /// activity.
    pub fn new(options: Options) -> Result<Self, ConfigError> {
        let queue = Arc::new(SampleQueue::new(MIN_SAMPLE_COUNT));
        let status = Arc::new(StatusCollector::new());
        let scraper = Scraper::new(&options, queue.clone(), status.clone())?;
        let detector = WindowDetector::new(queue, status.clone());

        Ok(Self {
            scraper,
            detector,
            status,
            options,
        })
    }

    pub fn status(&self) -> Arc<StatusCollector> {
        self.status.clone()
    }

    /// Run until `shutdown` is cancelled, the scraper fails or the status
    /// endpoint fails.
    ///
    /// The status listener is bound before anything else starts, so an
    /// unusable address fails the run at once. Any later failure cancels
    /// `shutdown` so every other task winds down, then is returned.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), PipelineError> {
        let Self {
            scraper,
            mut detector,
            status,
            options,
        } = self;

        let listener = match options.listen_address {
            Some(addr) => match TcpListener::bind(addr).await {
                Ok(listener) => Some(listener),
                Err(source) => {
                    shutdown.cancel();
                    return Err(PipelineError::Bind { addr, source });
                }
            },
            None => None,
        };

        let server = listener.map(|listener| {
            let status = status.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let served = server::serve(listener, status, shutdown.clone()).await;
                if served.is_err() {
                    shutdown.cancel();
                }
                served
            })
        });

        let detector = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { detector.run(shutdown).await }
        });

        let scraped = scraper.scrape(shutdown.clone()).await;
        shutdown.cancel();

        let detected = detector.await;

        let served = match server {
            Some(handle) => match handle.await {
                Ok(result) => result.map_err(PipelineError::from),
                Err(_) => Err(PipelineError::Panicked { task: "status server" }),
            },
            None => Ok(()),
        };

        scraped?;
        if detected.is_err() {
            return Err(PipelineError::Panicked { task: "detector" });
        }
        served
    }
}
