use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::analytics::{
    ClientSummary, EndpointSummary, PercentileSet, ResourceSummary,
    TimeSeriesBucket, UsageOverview,
};
use crate::AppState;

use super::AppError;

// ─── Query parameters ────────────────────────────────────────────

/// Raw strings so malformed values fall back instead of rejecting
/// the request.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeSeriesParams {
    pub interval: Option<String>,
    pub duration: Option<String>,
}

const DEFAULT_LIMIT: usize = 20;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_LOOKBACK: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub retained: usize,
    pub capacity: usize,
}

// ─── GET /analytics/overview ─────────────────────────────────────

pub async fn overview(
    State(state): State<Arc<AppState>>,
) -> Json<UsageOverview> {
    Json(state.tracker.overview())
}

// ─── GET /analytics/endpoints ────────────────────────────────────

pub async fn list_endpoints(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<EndpointSummary>> {
    let limit = parse_limit(params.limit.as_deref());
    Json(state.tracker.top_endpoints(limit))
}

// ─── GET /analytics/endpoints/*path ──────────────────────────────

pub async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<EndpointSummary>, AppError> {
    // The wildcard capture drops the leading slash; an encoded
    // "%2Ffhir%2FPatient" keeps it.
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };

    state
        .tracker
        .endpoint(&path)
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("endpoint '{path}' not found"))
        })
}

// ─── GET /analytics/clients ──────────────────────────────────────

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Json<Vec<ClientSummary>> {
    let limit = parse_limit(params.limit.as_deref());
    Json(state.tracker.top_clients(limit))
}

// ─── GET /analytics/clients/:id ──────────────────────────────────

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClientSummary>, AppError> {
    state
        .tracker
        .client(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("client '{id}' not found")))
}

// ─── GET /analytics/resources ────────────────────────────────────

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ResourceSummary>> {
    Json(state.tracker.resources())
}

// ─── GET /analytics/timeseries ───────────────────────────────────

pub async fn time_series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TimeSeriesParams>,
) -> Json<Vec<TimeSeriesBucket>> {
    let interval = parse_duration(params.interval.as_deref(), DEFAULT_INTERVAL);
    let lookback = parse_duration(params.duration.as_deref(), DEFAULT_LOOKBACK);
    Json(state.tracker.time_series(interval, lookback))
}

// ─── GET /analytics/latency ──────────────────────────────────────

pub async fn latency(
    State(state): State<Arc<AppState>>,
) -> Json<PercentileSet> {
    Json(state.tracker.latency_percentiles())
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        retained: state.tracker.retained(),
        capacity: state.tracker.capacity(),
    })
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Positive integers are taken as-is; anything else means the default.
fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(DEFAULT_LIMIT)
}

/// `"7d"` is whole days; everything else goes through humantime
/// (`"5m"`, `"1h 30m"`, `"250ms"`). Empty, unparsable or zero → `default`.
fn parse_duration(raw: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };

    let parsed = match raw.strip_suffix('d') {
        Some(days) => days
            .parse::<u64>()
            .ok()
            .and_then(|d| d.checked_mul(24 * 60 * 60))
            .map(Duration::from_secs),
        None => humantime::parse_duration(raw).ok(),
    };

    parsed.filter(|d| !d.is_zero()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_falls_back_on_bad_input() {
        assert_eq!(parse_limit(None), 20);
        assert_eq!(parse_limit(Some("7")), 7);
        assert_eq!(parse_limit(Some("0")), 20);
        assert_eq!(parse_limit(Some("-3")), 20);
        assert_eq!(parse_limit(Some("ten")), 20);
    }

    #[test]
    fn durations_with_day_suffix() {
        let def = Duration::from_secs(1);
        let week = Duration::from_secs(7 * 86_400);
        assert_eq!(parse_duration(Some("7d"), def), week);
        assert_eq!(parse_duration(Some("xd"), def), def);
    }

    #[test]
    fn durations_through_humantime() {
        let def = Duration::from_secs(1);
        assert_eq!(parse_duration(Some("5m"), def), Duration::from_secs(300));
        assert_eq!(parse_duration(Some("1h"), def), Duration::from_secs(3600));
        let ninety = Duration::from_secs(5400);
        assert_eq!(parse_duration(Some("1h 30m"), def), ninety);
        let quarter = Duration::from_millis(250);
        assert_eq!(parse_duration(Some("250ms"), def), quarter);
    }

    #[test]
    fn durations_fall_back() {
        let def = Duration::from_secs(1);
        assert_eq!(parse_duration(None, def), def);
        assert_eq!(parse_duration(Some(""), def), def);
        assert_eq!(parse_duration(Some("soon"), def), def);
        assert_eq!(parse_duration(Some("0s"), def), def);
    }

    #[test]
    fn day_counts_beyond_the_date_range_still_parse() {
        let def = Duration::from_secs(1);
        let huge = Duration::from_secs(100_000_000 * 86_400);
        assert_eq!(parse_duration(Some("100000000d"), def), huge);
    }
}
