use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::analytics::{extract_resource_type, RequestMetric};
use crate::AppState;

/// Records one `RequestMetric` per request into the usage tracker and adds
///
///   X-Response-Time-Us  — total handler wall time in microseconds
///   Server-Timing       — same value in the standard Server-Timing format
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let timestamp = Utc::now();
    let method = req.method().as_str().to_owned();
    let path = req.uri().path().to_owned();

    let headers = req.headers();
    let client_id = header_str(headers, &state.config.client_header);
    let tenant_id = header_str(headers, &state.config.tenant_header);
    let request_size = content_length(headers).unwrap_or(0);

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    let status = response.status().as_u16();
    let response_size = response
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(response.headers()))
        .unwrap_or(0);

    // The SSE feed would log once per connection lifetime, not per request
    if !path.ends_with("/stream") {
        debug!(%method, %path, status, us = us as u64, "request");
    }

    state.tracker.record(RequestMetric {
        timestamp,
        resource_type: extract_resource_type(&path),
        method,
        path,
        status_code: status,
        duration: elapsed,
        client_id,
        tenant_id,
        request_size,
        response_size,
    });

    response
}

/// Header value as a string; empty when absent or not visible ASCII.
fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_owned())
        .unwrap_or_default()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
