use std::sync::Arc;

use axum::{middleware as axum_mw, routing::get, Extension, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::middleware::timing;
use crate::status::{stream, StatusCollector};

/// Builds the read-only status `Router`. Open event streams end when
/// `shutdown` is cancelled.
pub fn create_router(status: Arc<StatusCollector>, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/api/status", get(stream::get_status))
        .route("/api/status/stream", get(stream::status_stream))
        .route("/-/healthy", get(stream::healthy))
        .with_state(status)
        .layer(Extension(shutdown))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

/// Serve the status endpoint on an already bound `listener` until `shutdown`
/// is cancelled.
pub async fn serve(
    listener: TcpListener,
    status: Arc<StatusCollector>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "status endpoint listening");

    axum::serve(listener, create_router(status, shutdown.clone()))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("status endpoint stopped");
    Ok(())
}
