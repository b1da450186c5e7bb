use std::sync::Arc;

use super::RequestMetric;

/// Fixed-capacity store of the most recent metrics.
///
/// Appends until full, then overwrites slots cyclically from index 0.
/// Eviction order is insertion order. Metrics are held behind `Arc`
/// so readers can take a cheap private copy of the window.
pub struct RingBuffer {
    slots: Vec<Arc<RequestMetric>>,
    capacity: usize,
    cursor: usize,
    full: bool,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            full: false,
        }
    }

    pub fn insert(&mut self, metric: Arc<RequestMetric>) {
        if self.full {
            self.slots[self.cursor] = metric;
        } else {
            self.slots.push(metric);
        }

        self.cursor += 1;
        if self.cursor == self.capacity {
            self.cursor = 0;
            self.full = true;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the retained window, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<RequestMetric>> {
        if !self.full {
            return self.slots.clone();
        }

        let mut out = Vec::with_capacity(self.capacity);
        out.extend_from_slice(&self.slots[self.cursor..]);
        out.extend_from_slice(&self.slots[..self.cursor]);
        out
    }
}
