//! Scraper against a live exposition endpoint: fetch → search → queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use common::{payload, ExpositionServer, Reply, FIXTURE};
use mad::detect::Window;
use mad::{detect, FetchError, Options, SampleQueue, Scraper, StatusCollector, MIN_SAMPLE_COUNT};

const SELECTOR: &str = r#"mock_metric{fixture="binary"}"#;

type Parts = (Scraper, Arc<SampleQueue>, Arc<StatusCollector>);

fn scraper(url: String, interval: Duration) -> Parts {
    let queue = Arc::new(SampleQueue::new(MIN_SAMPLE_COUNT));
    let status = Arc::new(StatusCollector::new());
    let options = Options::new(interval, SELECTOR, url);
    let scraper = Scraper::new(&options, queue.clone(), status.clone()).unwrap();
    (scraper, queue, status)
}

#[tokio::test]
async fn binary_fixture_yields_expected_change_points() {
    let server =
        ExpositionServer::start(|n| Reply::ok(payload(FIXTURE[n % FIXTURE.len()] as f64))).await;
    let (scraper, queue, _status) = scraper(server.url(), Duration::from_millis(10));

    let shutdown = CancellationToken::new();
    let scraping = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scraper.scrape(shutdown).await })
    };

    let mut window = Window::new();
    let collect = async {
        while window.len() < FIXTURE.len() {
            window.push(queue.pop().await.expect("queue closed early"));
        }
    };
    tokio::time::timeout(Duration::from_secs(30), collect)
        .await
        .expect("timed out waiting for samples");

    shutdown.cancel();
    scraping.await.unwrap().unwrap();

    let (values, timestamps) = window.split();
    let expected: Vec<f64> = FIXTURE.iter().map(|&v| v as f64).collect();
    assert_eq!(values, expected);
    assert!(timestamps.windows(2).all(|t| t[0] <= t[1]));

    assert_eq!(detect(&values, 1), vec![61, 94]);
}

#[tokio::test]
async fn one_sample_per_matching_scrape() {
    let server = ExpositionServer::start(|_| Reply::ok(payload(3.5))).await;
    let (scraper, queue, status) = scraper(server.url(), Duration::from_millis(20));

    let shutdown = CancellationToken::new();
    let scraping = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scraper.scrape(shutdown).await })
    };

    let sample = tokio::time::timeout(Duration::from_secs(5), queue.pop())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sample.value(), 3.5);

    shutdown.cancel();
    scraping.await.unwrap().unwrap();

    let snapshot = status.snapshot();
    assert!(snapshot.scrapes_total >= 1);
    assert!(snapshot.samples_total >= 1);
    assert!(snapshot.samples_total <= snapshot.scrapes_total);
    assert_eq!(snapshot.targets_missing_total, 0);
}

#[tokio::test]
async fn payload_without_target_enqueues_nothing() {
    let server = ExpositionServer::start(|_| Reply::ok("# nothing here\nother_metric 1\n")).await;
    let (scraper, queue, status) = scraper(server.url(), Duration::from_millis(10));

    let shutdown = CancellationToken::new();
    let scraping = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scraper.scrape(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(queue.is_empty());

    shutdown.cancel();
    scraping.await.unwrap().unwrap();

    assert!(server.hits() > 0);
    let snapshot = status.snapshot();
    assert_eq!(snapshot.samples_total, 0);
    assert!(snapshot.targets_missing_total > 0);
}

#[tokio::test]
async fn malformed_sample_only_skips_that_scrape() {
    let server = ExpositionServer::start(|n| {
        if n == 0 {
            Reply::ok("mock_metric{fixture=\"binary\"} not-a-number\n")
        } else {
            Reply::ok(payload(9.0))
        }
    })
    .await;
    let (scraper, queue, status) = scraper(server.url(), Duration::from_millis(10));

    let shutdown = CancellationToken::new();
    let scraping = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scraper.scrape(shutdown).await })
    };

    let sample = tokio::time::timeout(Duration::from_secs(5), queue.pop())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sample.value(), 9.0);

    shutdown.cancel();
    scraping.await.unwrap().unwrap();
    assert_eq!(status.snapshot().parse_errors_total, 1);
}

#[tokio::test]
async fn non_200_response_is_fatal() {
    let server =
        ExpositionServer::start(|_| Reply::status(StatusCode::INTERNAL_SERVER_ERROR)).await;
    let (scraper, queue, _status) = scraper(server.url(), Duration::from_millis(10));

    let err = tokio::time::timeout(Duration::from_secs(5), scraper.scrape(CancellationToken::new()))
        .await
        .expect("scraper should stop on its own")
        .unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR),
        other => panic!("unexpected error: {other}"),
    }
    // No retry.
    assert_eq!(server.hits(), 1);
    assert!(queue.is_closed());
}

#[tokio::test]
async fn unreachable_endpoint_is_fatal() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/metrics");
    let (scraper, _queue, _status) = scraper(url, Duration::from_millis(10));
    let err = tokio::time::timeout(Duration::from_secs(5), scraper.scrape(CancellationToken::new()))
        .await
        .expect("scraper should stop on its own")
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }), "{err}");
}

#[tokio::test]
async fn shutdown_aborts_a_slow_fetch() {
    let server =
        ExpositionServer::start(|_| Reply::ok(payload(1.0)).delayed(Duration::from_secs(30))).await;
    let (scraper, queue, _status) = scraper(server.url(), Duration::from_millis(10));

    let shutdown = CancellationToken::new();
    let scraping = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scraper.scrape(shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.hits(), 1);
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(2), scraping)
        .await
        .expect("scraper should stop promptly")
        .unwrap()
        .unwrap();
    assert!(queue.is_empty());
    assert!(queue.is_closed());
}
