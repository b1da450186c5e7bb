use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::entries::{ClientEntry, EndpointEntry, ResourceEntry};
use super::{serialize_millis, RequestMetric};

/// How many endpoints / clients the overview ranks.
pub const OVERVIEW_TOP_N: usize = 5;

// ─── Wire types ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub path: String,
    pub total_requests: u64,
    pub error_rate: f64,
    #[serde(rename = "avg_latency_ms", serialize_with = "serialize_millis")]
    pub avg_latency: Duration,
    #[serde(rename = "p95_latency_ms", serialize_with = "serialize_millis")]
    pub p95_latency: Duration,
    pub status_breakdown: BTreeMap<u16, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSummary {
    pub client_id: String,
    pub total_requests: u64,
    pub error_rate: f64,
    pub last_seen: DateTime<Utc>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub resource_type: String,
    pub read_count: u64,
    pub create_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub search_count: u64,
    pub total: u64,
}

/// Process-wide picture shipped by `/analytics/overview` and the SSE feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageOverview {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    #[serde(rename = "avg_latency_ms", serialize_with = "serialize_millis")]
    pub avg_latency: Duration,
    pub unique_clients: usize,
    pub unique_endpoints: usize,
    pub top_endpoints: Vec<EndpointSummary>,
    pub top_clients: Vec<ClientSummary>,
}

// ─── Builders ────────────────────────────────────────────────────

impl EndpointSummary {
    /// `latencies` are the retained samples for this path, in any order.
    pub fn build(
        path: &str,
        entry: &EndpointEntry,
        latencies: Vec<Duration>,
    ) -> Self {
        Self {
            path: path.to_owned(),
            total_requests: entry.total_requests,
            error_rate: ratio(entry.total_errors, entry.total_requests),
            avg_latency: average(entry.total_duration, entry.total_requests),
            p95_latency: p95(latencies),
            status_breakdown: entry.status_counts.clone(),
        }
    }
}

impl ClientSummary {
    pub fn build(client_id: &str, entry: &ClientEntry) -> Self {
        Self {
            client_id: client_id.to_owned(),
            total_requests: entry.total_requests,
            error_rate: ratio(entry.total_errors, entry.total_requests),
            last_seen: entry.last_seen,
            bytes_sent: entry.bytes_sent,
            bytes_received: entry.bytes_received,
        }
    }
}

impl ResourceSummary {
    pub fn build(resource_type: &str, entry: &ResourceEntry) -> Self {
        Self {
            resource_type: resource_type.to_owned(),
            read_count: entry.read,
            create_count: entry.create,
            update_count: entry.update,
            delete_count: entry.delete,
            search_count: entry.search,
            total: entry.total(),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// `num / den`, or 0 when nothing has been counted.
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Mean duration, or zero for an empty count.
pub fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / count as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Sample at index `floor(0.95 * n)`, clamped to the last one.
pub fn p95(mut latencies: Vec<Duration>) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }
    latencies.sort_unstable();

    let n = latencies.len();
    let idx = (n * 95 / 100).min(n - 1);
    latencies[idx]
}

/// Groups retained sample latencies by path in a single pass.
pub fn latencies_by_path(
    samples: &[Arc<RequestMetric>],
) -> HashMap<&str, Vec<Duration>> {
    let mut out: HashMap<&str, Vec<Duration>> = HashMap::new();
    for m in samples {
        out.entry(m.path.as_str()).or_default().push(m.duration);
    }
    out
}

/// Sorts by request count descending, then key ascending, and keeps `n`.
pub fn top_n<T>(
    mut items: Vec<T>,
    n: usize,
    key: impl Fn(&T) -> (u64, &str),
) -> Vec<T> {
    items.sort_by(|a, b| {
        let (ra, ka) = key(a);
        let (rb, kb) = key(b);
        rb.cmp(&ra).then_with(|| ka.cmp(kb))
    });
    items.truncate(n);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::metric;

    #[test]
    fn p95_on_uniform_distribution() {
        let lat: Vec<Duration> =
            (1..=100).rev().map(Duration::from_millis).collect();
        // floor(0.95 * 100) = 95 → the 96th smallest sample.
        assert_eq!(p95(lat), Duration::from_millis(96));
    }

    #[test]
    fn p95_degrades_gracefully() {
        assert_eq!(p95(Vec::new()), Duration::ZERO);
        assert_eq!(p95(vec![Duration::from_millis(7)]), Duration::from_millis(7));
    }

    #[test]
    fn zero_requests_give_zero_rates() {
        let s = EndpointSummary::build("/x", &EndpointEntry::default(), Vec::new());
        assert_eq!(s.error_rate, 0.0);
        assert_eq!(s.avg_latency, Duration::ZERO);
        assert_eq!(s.p95_latency, Duration::ZERO);
    }

    #[test]
    fn endpoint_summary_rates() {
        let mut e = EndpointEntry::default();
        e.observe(&metric("GET", "/x", 200, 10));
        e.observe(&metric("GET", "/x", 200, 20));
        e.observe(&metric("GET", "/x", 503, 30));
        e.observe(&metric("GET", "/x", 404, 40));

        let s = EndpointSummary::build("/x", &e, vec![Duration::from_millis(10)]);
        assert_eq!(s.total_requests, 4);
        assert_eq!(s.error_rate, 0.5);
        assert_eq!(s.avg_latency, Duration::from_millis(25));
        assert_eq!(s.status_breakdown.get(&200), Some(&2));
    }

    #[test]
    fn top_n_orders_by_count_then_key() {
        let items = vec![("b", 3u64), ("a", 3), ("c", 9), ("d", 1)];
        let ranked = top_n(items, 3, |(k, n)| (*n, *k));
        assert_eq!(ranked, vec![("c", 9), ("a", 3), ("b", 3)]);
    }

    #[test]
    fn top_n_returns_fewer_when_short() {
        let ranked = top_n(vec![("a", 1u64)], 5, |(k, n)| (*n, *k));
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn endpoint_summary_serializes_millis() {
        let mut e = EndpointEntry::default();
        e.observe(&metric("GET", "/x", 200, 3));
        let s = EndpointSummary::build("/x", &e, vec![Duration::from_millis(3)]);

        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["avg_latency_ms"], 3.0);
        assert_eq!(json["p95_latency_ms"], 3.0);
        assert_eq!(json["status_breakdown"]["200"], 1);
    }
}
