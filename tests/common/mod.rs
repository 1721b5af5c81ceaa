//! A throwaway exposition endpoint for scraper tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

pub const METRICS_PATH: &str = "/metrics";

/// The canonical binary regression series.
pub const FIXTURE: [u8; 100] = [
    1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0, 0, 1, 0,
    0, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0,
    0, 0, 0, 1,
];

/// What the endpoint answers to its `n`th request (0-based).
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Respond = dyn Fn(usize) -> Reply + Send + Sync;

#[derive(Clone)]
struct Ctx {
    hits: Arc<AtomicUsize>,
    respond: Arc<Respond>,
}

pub struct ExpositionServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl ExpositionServer {
    pub async fn start(respond: impl Fn(usize) -> Reply + Send + Sync + 'static) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let ctx = Ctx {
            hits: hits.clone(),
            respond: Arc::new(respond),
        };
        let app = Router::new()
            .route(METRICS_PATH, get(handle_metrics))
            .with_state(ctx);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .unwrap();
        });

        Self {
            addr,
            hits,
            shutdown,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, METRICS_PATH)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for ExpositionServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_metrics(State(ctx): State<Ctx>) -> (StatusCode, String) {
    let n = ctx.hits.fetch_add(1, Ordering::SeqCst);
    let reply = (ctx.respond)(n);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (reply.status, reply.body)
}

/// A scrape payload carrying `value` for `mock_metric{fixture="binary"}`,
/// surrounded by metadata and unrelated series.
pub fn payload(value: f64) -> String {
    format!(
        "# HELP mock_metric Mock metric\n\
         # TYPE mock_metric gauge\n\
         mock_metric{{fixture=\"other\"}} 42\n\
         mock_metric{{fixture=\"binary\"}} {value}\n\
         \n\
         process_open_fds 7\n"
    )
}
