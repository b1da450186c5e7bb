pub mod classify;
pub mod entries;
pub mod percentiles;
pub mod ring;
pub mod summary;
pub mod timeseries;
pub mod tracker;

use chrono::{DateTime, Utc};
use std::time::Duration;

pub use classify::extract_resource_type;
pub use percentiles::PercentileSet;
pub use summary::{ClientSummary, EndpointSummary, ResourceSummary, UsageOverview};
pub use timeseries::TimeSeriesBucket;
pub use tracker::UsageTracker;

/// One completed request, as observed by the tracking middleware.
/// This is the "write" side — built once per request, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RequestMetric {
    /// Wall-clock time the request started
    pub timestamp: DateTime<Utc>,
    /// e.g. "GET"
    pub method: String,
    /// Raw URL path, e.g. "/fhir/Patient/123"
    pub path: String,
    pub status_code: u16,
    pub duration: Duration,
    /// Caller identifier; empty when the request carried none
    pub client_id: String,
    /// Tenant identifier; carried along but not aggregated
    pub tenant_id: String,
    /// Derived from `path`, empty for non-FHIR paths
    pub resource_type: String,
    pub request_size: u64,
    pub response_size: u64,
}

impl RequestMetric {
    /// Status codes from 400 upwards count as errors.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

// ─── Serde helpers ───────────────────────────────────────────────

/// Durations go on the wire as fractional milliseconds.
pub(crate) fn serialize_millis<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}
