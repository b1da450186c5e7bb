use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::classify::classify;
use super::entries::{ClientEntry, EndpointEntry, ResourceEntry};
use super::percentiles::PercentileSet;
use super::ring::RingBuffer;
use super::summary::{
    average, latencies_by_path, ratio, top_n, ClientSummary, EndpointSummary,
    ResourceSummary, UsageOverview, OVERVIEW_TOP_N,
};
use super::timeseries::{self, TimeSeriesBucket};
use super::RequestMetric;

/// Ring-buffer capacity used when the configured one isn't positive.
pub const DEFAULT_CAPACITY: usize = 100_000;

type Table<T> = HashMap<String, Arc<Mutex<T>>>;

/// In-process API usage aggregator.
///
/// Global totals are plain atomics. The ring buffer and the key → entry
/// maps sit behind one `RwLock`, which is only held for the ring insert
/// and entry lookup/creation. Each entry carries its own `Mutex` for its
/// counters, so writers touching different keys don't contend.
pub struct UsageTracker {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    total_duration_ns: AtomicU64,

    shared: RwLock<Shared>,
}

struct Shared {
    ring: RingBuffer,
    endpoints: Table<EndpointEntry>,
    clients: Table<ClientEntry>,
    resources: Table<ResourceEntry>,
}

/// Entries a single `record` call will update, resolved under the shared lock.
struct Targets {
    endpoint: Arc<Mutex<EndpointEntry>>,
    client: Option<Arc<Mutex<ClientEntry>>>,
    resource: Option<Arc<Mutex<ResourceEntry>>>,
}

// ─── Construction ────────────────────────────────────────────────

impl UsageTracker {
    /// `capacity <= 0` falls back to [`DEFAULT_CAPACITY`].
    pub fn new(capacity: i64) -> Self {
        let capacity = usize::try_from(capacity)
            .ok()
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_CAPACITY);

        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_duration_ns: AtomicU64::new(0),
            shared: RwLock::new(Shared {
                ring: RingBuffer::new(capacity),
                endpoints: HashMap::new(),
                clients: HashMap::new(),
                resources: HashMap::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.read().ring.capacity()
    }

    /// Number of metrics currently held in the ring buffer.
    pub fn retained(&self) -> usize {
        self.shared.read().ring.len()
    }
}

// ─── Recording ───────────────────────────────────────────────────

impl UsageTracker {
    /// Record one completed request. Called once per request by the middleware.
    pub fn record(&self, metric: RequestMetric) {
        let is_error = metric.is_error();

        // ── Global totals (lock-free) ───────────────────────────
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        let nanos = u64::try_from(metric.duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_duration_ns.fetch_add(nanos, Ordering::Relaxed);

        // ── Ring insert + entry lookup under the shared lock ────
        let metric = Arc::new(metric);
        let targets = self.insert_and_resolve(&metric);

        // ── Per-entry counters, shared lock released ────────────
        targets.endpoint.lock().observe(&metric);

        if let Some(client) = targets.client {
            client.lock().observe(&metric);
        }

        if let Some(resource) = targets.resource {
            let op =
                classify(&metric.method, &metric.path, &metric.resource_type);
            if let Some(op) = op {
                resource.lock().observe(op);
            }
        }
    }

    fn insert_and_resolve(&self, metric: &Arc<RequestMetric>) -> Targets {
        let mut shared = self.shared.write();
        shared.ring.insert(Arc::clone(metric));

        let endpoint = get_or_create(
            &mut shared.endpoints,
            &metric.path,
            "endpoint",
            EndpointEntry::default,
        );

        let client = (!metric.client_id.is_empty()).then(|| {
            get_or_create(&mut shared.clients, &metric.client_id, "client", || {
                ClientEntry::new(metric.timestamp)
            })
        });

        let resource = (!metric.resource_type.is_empty()).then(|| {
            get_or_create(
                &mut shared.resources,
                &metric.resource_type,
                "resource",
                ResourceEntry::default,
            )
        });

        Targets {
            endpoint,
            client,
            resource,
        }
    }
}

/// Existing entry for `key`, or a fresh one inserted while the write lock is held.
fn get_or_create<T>(
    table: &mut Table<T>,
    key: &str,
    kind: &str,
    init: impl FnOnce() -> T,
) -> Arc<Mutex<T>> {
    if let Some(entry) = table.get(key) {
        return Arc::clone(entry);
    }

    debug!(kind, key, "new analytics key");
    let entry = Arc::new(Mutex::new(init()));
    table.insert(key.to_owned(), Arc::clone(&entry));
    entry
}

// ─── Queries ─────────────────────────────────────────────────────

impl UsageTracker {
    pub fn overview(&self) -> UsageOverview {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let total_duration =
            Duration::from_nanos(self.total_duration_ns.load(Ordering::Relaxed));

        let (unique_endpoints, unique_clients) = {
            let shared = self.shared.read();
            (shared.endpoints.len(), shared.clients.len())
        };

        UsageOverview {
            total_requests,
            total_errors,
            error_rate: ratio(total_errors, total_requests),
            avg_latency: average(total_duration, total_requests),
            unique_clients,
            unique_endpoints,
            top_endpoints: self.top_endpoints(OVERVIEW_TOP_N),
            top_clients: self.top_clients(OVERVIEW_TOP_N),
        }
    }

    pub fn endpoint(&self, path: &str) -> Option<EndpointSummary> {
        let (entry, samples) = {
            let shared = self.shared.read();
            (shared.endpoints.get(path).cloned()?, shared.ring.snapshot())
        };

        let latencies = samples
            .iter()
            .filter(|m| m.path == path)
            .map(|m| m.duration)
            .collect();

        let entry = entry.lock().clone();
        Some(EndpointSummary::build(path, &entry, latencies))
    }

    pub fn top_endpoints(&self, n: usize) -> Vec<EndpointSummary> {
        let (entries, samples) = {
            let shared = self.shared.read();
            (snapshot_table(&shared.endpoints), shared.ring.snapshot())
        };

        let mut by_path = latencies_by_path(&samples);
        let summaries: Vec<EndpointSummary> = entries
            .into_iter()
            .map(|(path, entry)| {
                let latencies = by_path.remove(path.as_str()).unwrap_or_default();
                let entry = entry.lock().clone();
                EndpointSummary::build(&path, &entry, latencies)
            })
            .collect();

        top_n(summaries, n, |s| (s.total_requests, s.path.as_str()))
    }

    pub fn client(&self, client_id: &str) -> Option<ClientSummary> {
        let entry = self.shared.read().clients.get(client_id).cloned()?;
        let summary = ClientSummary::build(client_id, &entry.lock());
        Some(summary)
    }

    pub fn top_clients(&self, n: usize) -> Vec<ClientSummary> {
        let entries = snapshot_table(&self.shared.read().clients);

        let summaries: Vec<ClientSummary> = entries
            .into_iter()
            .map(|(id, entry)| {
                let entry = entry.lock();
                ClientSummary::build(&id, &entry)
            })
            .collect();

        top_n(summaries, n, |s| (s.total_requests, s.client_id.as_str()))
    }

    /// Every known resource type, ordered by name.
    pub fn resources(&self) -> Vec<ResourceSummary> {
        let entries = snapshot_table(&self.shared.read().resources);

        let mut out: Vec<ResourceSummary> = entries
            .into_iter()
            .map(|(rt, entry)| {
                let entry = entry.lock();
                ResourceSummary::build(&rt, &entry)
            })
            .collect();
        out.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        out
    }

    /// Bucketed request counts over the retained window. See
    /// [`timeseries::build`] for how oversized or out-of-range windows
    /// are handled.
    pub fn time_series(
        &self,
        interval: Duration,
        lookback: Duration,
    ) -> Vec<TimeSeriesBucket> {
        self.time_series_at(Utc::now(), interval, lookback)
    }

    pub fn time_series_at(
        &self,
        now: DateTime<Utc>,
        interval: Duration,
        lookback: Duration,
    ) -> Vec<TimeSeriesBucket> {
        let samples = self.shared.read().ring.snapshot();
        timeseries::build(&samples, now, interval, lookback)
    }

    /// Latency percentiles across the whole retained window.
    pub fn latency_percentiles(&self) -> PercentileSet {
        let samples = self.shared.read().ring.snapshot();
        PercentileSet::from_samples(&samples)
    }
}

/// Copies the key set out so entry locks are taken after the shared lock is gone.
fn snapshot_table<T>(table: &Table<T>) -> Vec<(String, Arc<Mutex<T>>)> {
    table
        .iter()
        .map(|(k, v)| (k.clone(), Arc::clone(v)))
        .collect()
}
