use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::AppState;

// ─── GET /analytics/stream ───────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the current `UsageOverview` as JSON every stream interval.

pub async fn overview_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.config.stream_interval());

    let stream = IntervalStream::new(interval).map(move |_| {
        let overview = state.tracker.overview();
        let json = serde_json::to_string(&overview).unwrap_or_default();
        Ok(Event::default().event("overview").data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
