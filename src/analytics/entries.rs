use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use super::classify::ResourceOp;
use super::RequestMetric;

/// Running totals for one endpoint path.
#[derive(Debug, Clone, Default)]
pub struct EndpointEntry {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_duration: Duration,
    /// Status code → count. Always sums to `total_requests`.
    pub status_counts: BTreeMap<u16, u64>,
}

impl EndpointEntry {
    pub fn observe(&mut self, metric: &RequestMetric) {
        self.total_requests += 1;
        if metric.is_error() {
            self.total_errors += 1;
        }
        self.total_duration += metric.duration;
        *self.status_counts.entry(metric.status_code).or_insert(0) += 1;
    }
}

/// Running totals for one caller.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    pub total_requests: u64,
    pub total_errors: u64,
    pub last_seen: DateTime<Utc>,
    /// Response bytes sent to the client
    pub bytes_sent: u64,
    /// Request bytes received from the client
    pub bytes_received: u64,
}

impl ClientEntry {
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            total_requests: 0,
            total_errors: 0,
            last_seen: first_seen,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    pub fn observe(&mut self, metric: &RequestMetric) {
        self.total_requests += 1;
        if metric.is_error() {
            self.total_errors += 1;
        }
        self.last_seen = metric.timestamp;
        self.bytes_sent += metric.response_size;
        self.bytes_received += metric.request_size;
    }
}

/// CRUD-shaped counters for one resource type.
#[derive(Debug, Clone, Default)]
pub struct ResourceEntry {
    pub read: u64,
    pub create: u64,
    pub update: u64,
    pub delete: u64,
    pub search: u64,
}

impl ResourceEntry {
    pub fn observe(&mut self, op: ResourceOp) {
        let counter = match op {
            ResourceOp::Read => &mut self.read,
            ResourceOp::Create => &mut self.create,
            ResourceOp::Update => &mut self.update,
            ResourceOp::Delete => &mut self.delete,
            ResourceOp::Search => &mut self.search,
        };
        *counter += 1;
    }

    pub fn total(&self) -> u64 {
        self.read + self.create + self.update + self.delete + self.search
    }
}
