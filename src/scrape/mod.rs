pub mod search;
pub mod selector;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Options;
use crate::error::{ConfigError, FetchError};
use crate::queue::{Sample, SampleQueue};
use crate::status::StatusCollector;

pub use search::{search, search_line};
pub use selector::Selector;

/// Periodically fetches the endpoint and feeds the target series' value into
/// the sample queue.
pub struct Scraper {
    interval: Duration,
    selector: Arc<Selector>,
    endpoint: Url,
    client: Client,
    queue: Arc<SampleQueue>,
    status: Arc<StatusCollector>,
    in_flight: Arc<Semaphore>,
}

impl Scraper {
    /// Validate `options`. Nothing touches the network until [`Scraper::scrape`].
    pub fn new(
        options: &Options,
        queue: Arc<SampleQueue>,
        status: Arc<StatusCollector>,
    ) -> Result<Self, ConfigError> {
        if options.scrape_interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        let selector = Selector::parse(&options.time_series_selector)?;

        let endpoint = options.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        let endpoint = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                endpoint: endpoint.to_string(),
            });
        }

        if options.max_in_flight == 0 {
            return Err(ConfigError::InvalidInFlightLimit);
        }

        Ok(Self {
            interval: options.scrape_interval,
            selector: Arc::new(selector),
            endpoint,
            client: Client::new(),
            queue,
            status,
            in_flight: Arc::new(Semaphore::new(options.max_in_flight)),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Scrape once per interval until `shutdown` is cancelled.
    ///
    /// Any fetch failure ends the loop with that error; there is no retry.
    /// Each successful fetch is searched by a separate task so the next tick
    /// is not held up. On exit, in-flight searches are aborted and the queue
    /// is closed.
    pub async fn scrape(&self, shutdown: CancellationToken) -> Result<(), FetchError> {
        tracing::info!(
            endpoint = %self.endpoint,
            selector = %self.selector,
            interval_ms = self.interval.as_millis() as u64,
            queue_capacity = self.queue.capacity(),
            "scraper started"
        );

        let mut searches = JoinSet::new();
        let result = self.run(&shutdown, &mut searches).await;

        searches.shutdown().await;
        self.queue.close();

        tracing::info!(failed = result.is_err(), "scraper stopped");
        result
    }

    async fn run(
        &self,
        shutdown: &CancellationToken,
        searches: &mut JoinSet<()>,
    ) -> Result<(), FetchError> {
        // The first tick fires one interval from now, not immediately.
        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                tick = ticks.next() => {
                    if tick.is_none() {
                        return Ok(());
                    }
                }
            }

            // Reap searches that already finished.
            while searches.try_join_next().is_some() {}

            let started = Instant::now();
            let body = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                body = self.fetch() => body?,
            };
            self.status.record_fetch(started.elapsed());

            // Permits are handed out in request order, so with a single
            // permit samples reach the queue in tick order.
            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                permit = self.in_flight.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Ok(()),
                },
            };

            searches.spawn(search_and_push(
                body,
                self.selector.clone(),
                self.queue.clone(),
                self.status.clone(),
                permit,
            ));
        }
    }

    /// One GET against the endpoint, returning the body on `200 OK`.
    async fn fetch(&self) -> Result<String, FetchError> {
        let url = self.endpoint.to_string();

        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status { url, status });
        }

        response
            .text()
            .await
            .map_err(|source| FetchError::Body { url, source })
    }
}

/// Search one payload and push the value, if any, into the queue.
async fn search_and_push(
    body: String,
    selector: Arc<Selector>,
    queue: Arc<SampleQueue>,
    status: Arc<StatusCollector>,
    _permit: OwnedSemaphorePermit,
) {
    match search(&body, &selector) {
        Ok(Some(value)) => {
            if queue.push(Sample::now(value)).await.is_ok() {
                status.record_sample();
            } else {
                tracing::debug!(value, "sample queue closed, dropping sample");
            }
        }
        Ok(None) => {
            tracing::debug!(selector = %selector, "series not found in scrape");
            status.record_target_missing();
        }
        Err(err) => {
            tracing::error!(error = %err, "could not parse scraped sample");
            status.record_parse_error();
        }
    }
}
