use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use super::collector::{ChangePointRecord, StatusCollector, StatusSnapshot};

const STATUS_EVENT: &str = "status";
const CHANGE_POINT_EVENT: &str = "change_point";

// ─── GET /api/status ─────────────────────────────────────────────
/// Returns a single JSON snapshot.

pub async fn get_status(State(status): State<Arc<StatusCollector>>) -> Json<StatusSnapshot> {
    Json(status.snapshot())
}

// ─── GET /api/status/stream ──────────────────────────────────────
/// Server-Sent Events endpoint.
///
/// Every 500 ms sends a `status` event with the snapshot, followed by one
/// `change_point` event per change point recorded since the last tick. The
/// event id is the change point's running number. The stream ends on
/// shutdown.

pub async fn status_stream(
    State(status): State<Arc<StatusCollector>>,
    Extension(shutdown): Extension<CancellationToken>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));
    let mut reported = 0u64;

    let stream = IntervalStream::new(interval)
        .map(move |_| {
            let snapshot = status.snapshot();
            let mut events = vec![json_event(STATUS_EVENT, &snapshot)];

            let fresh = unreported(&snapshot, reported);
            let first_id = snapshot.change_points_total - fresh.len() as u64 + 1;
            for (id, record) in (first_id..).zip(fresh) {
                events.push(json_event(CHANGE_POINT_EVENT, record).id(id.to_string()));
            }
            reported = snapshot.change_points_total;

            stream::iter(events.into_iter().map(Ok))
        })
        .flatten()
        .take_until(shutdown.cancelled_owned());

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Change points in `snapshot` past the first `reported` ones. Records that
/// already fell out of the recent list are gone.
fn unreported(snapshot: &StatusSnapshot, reported: u64) -> &[ChangePointRecord] {
    let recent = &snapshot.recent_change_points;
    let fresh = snapshot.change_points_total.saturating_sub(reported);
    let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(recent.len());
    &recent[recent.len() - fresh..]
}

fn json_event<T: Serialize>(name: &'static str, payload: &T) -> Event {
    let json = serde_json::to_string(payload).unwrap_or_default();
    Event::default().event(name).data(json)
}

// ─── GET /-/healthy ──────────────────────────────────────────────

pub async fn healthy() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize) -> ChangePointRecord {
        ChangePointRecord {
            index,
            value: index as f64,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn only_new_change_points_are_unreported() {
        let status = StatusCollector::new();
        assert!(unreported(&status.snapshot(), 0).is_empty());

        status.record_detection(12, &[record(3), record(9)]);
        let snapshot = status.snapshot();
        let fresh: Vec<usize> = unreported(&snapshot, 0).iter().map(|r| r.index).collect();
        assert_eq!(fresh, vec![3, 9]);
        assert!(unreported(&snapshot, 2).is_empty());

        status.record_detection(5, &[record(4)]);
        let snapshot = status.snapshot();
        let fresh: Vec<usize> = unreported(&snapshot, 2).iter().map(|r| r.index).collect();
        assert_eq!(fresh, vec![4]);
    }

    #[test]
    fn evicted_change_points_are_skipped() {
        let status = StatusCollector::new();
        let batch: Vec<ChangePointRecord> = (0..250).map(record).collect();
        status.record_detection(1, &batch);

        let snapshot = status.snapshot();
        let fresh = unreported(&snapshot, 0);
        assert_eq!(fresh.len(), snapshot.recent_change_points.len());
        assert_eq!(fresh.last().map(|r| r.index), Some(249));
    }
}
