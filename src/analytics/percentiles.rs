use hdrhistogram::Histogram;
use serde::Serialize;
use std::sync::Arc;

use super::RequestMetric;

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

/// Latency percentile breakdown (μs) over the retained request window.
/// Served by `/analytics/latency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Builds a histogram from the samples' durations and reads it back.
    /// Returns zeroed values if there are no samples.
    pub fn from_samples(samples: &[Arc<RequestMetric>]) -> Self {
        let Ok(mut hist) =
            Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
        else {
            return Self::empty();
        };

        for m in samples {
            // Clamp into the tracked range
            let us = u64::try_from(m.duration.as_micros())
                .unwrap_or(u64::MAX)
                .clamp(HIST_LOW, HIST_HIGH);
            let _ = hist.record(us);
        }

        Self::from_histogram(&hist)
    }

    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_percentile(50.0),
            p95: hist.value_at_percentile(95.0),
            p99: hist.value_at_percentile(99.0),
            p999: hist.value_at_percentile(99.9),
            count: hist.len(),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            p999: 0,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::metric;
    use std::time::Duration;

    #[test]
    fn empty_window_is_all_zero() {
        assert_eq!(PercentileSet::from_samples(&[]), PercentileSet::empty());
    }

    #[test]
    fn uniform_window() {
        let samples: Vec<_> = (1..=100)
            .map(|ms| Arc::new(metric("GET", "/x", 200, ms)))
            .collect();

        let p = PercentileSet::from_samples(&samples);
        assert_eq!(p.count, 100);
        // 3 significant figures → within 0.1%
        assert!((999..=1001).contains(&p.min));
        assert!((94_900..=95_100).contains(&p.p95), "p95 = {}", p.p95);
        assert!(p.max >= 99_900);
    }

    #[test]
    fn oversized_duration_clamps_to_ceiling() {
        let mut m = metric("GET", "/x", 200, 1);
        m.duration = Duration::MAX;

        let p = PercentileSet::from_samples(&[Arc::new(m)]);
        assert_eq!(p.count, 1);
        assert!(p.max >= 59_900_000, "max = {}", p.max);
    }
}
