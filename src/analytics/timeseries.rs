use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{serialize_millis, RequestMetric};

/// Upper bound on buckets per series. 30 days at one-minute
/// resolution still fits.
pub const MAX_BUCKETS: u64 = 50_000;

/// One point of the `/analytics/timeseries` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesBucket {
    pub timestamp: DateTime<Utc>,
    pub request_count: u64,
    pub error_count: u64,
    #[serde(rename = "avg_latency_ms", serialize_with = "serialize_millis")]
    pub avg_latency: Duration,
}

/// Number of buckets a `(interval, lookback)` query asks for.
pub fn bucket_count(interval: Duration, lookback: Duration) -> u128 {
    let interval = interval.as_micros().max(1);
    lookback.as_micros() / interval + 1
}

/// `interval`, widened just enough that the series stays within
/// [`MAX_BUCKETS`].
pub fn effective_interval(interval: Duration, lookback: Duration) -> Duration {
    if bucket_count(interval, lookback) <= u128::from(MAX_BUCKETS) {
        return interval;
    }

    let us = lookback.as_micros().div_ceil(u128::from(MAX_BUCKETS - 1));
    Duration::from_micros(u64::try_from(us).unwrap_or(u64::MAX))
}

/// Buckets `samples` into fixed `interval` slots covering `lookback`
/// up to `now`.
///
/// The first bucket starts at `now - lookback` truncated down to an
/// interval boundary. Boundaries are aligned to the Unix epoch, so an
/// interval that doesn't divide a day (`7s`, `7d`) gets epoch-relative
/// buckets. The interval is widened when the window would need more
/// than [`MAX_BUCKETS`] buckets. A window reaching outside the
/// representable date range yields an empty series. Samples outside
/// `[start, now]` are ignored.
pub fn build(
    samples: &[Arc<RequestMetric>],
    now: DateTime<Utc>,
    interval: Duration,
    lookback: Duration,
) -> Vec<TimeSeriesBucket> {
    let interval = effective_interval(interval, lookback);
    let interval_us = micros(interval).max(1);

    let lookback_us = micros(lookback);
    let Some(start_us) = window_start(now, interval_us, lookback_us) else {
        return Vec::new();
    };
    let Some(mut buckets) =
        empty_buckets(now, start_us, interval_us, lookback)
    else {
        return Vec::new();
    };

    let now_us = now.timestamp_micros();
    for m in samples {
        let ts = m.timestamp.timestamp_micros();
        if ts < start_us || ts > now_us {
            continue;
        }

        let idx = (ts - start_us) / interval_us;
        let Some(bucket) = usize::try_from(idx)
            .ok()
            .and_then(|i| buckets.get_mut(i))
        else {
            continue;
        };
        bucket.request_count += 1;
        if m.is_error() {
            bucket.error_count += 1;
        }
        // Summed here, turned into an average below
        bucket.avg_latency += m.duration;
    }

    for b in &mut buckets {
        b.avg_latency = super::summary::average(b.avg_latency, b.request_count);
    }

    buckets
}

/// `now - lookback` truncated to an interval boundary, in µs since the
/// epoch. `None` when it falls outside what `DateTime` can hold.
fn window_start(
    now: DateTime<Utc>,
    interval_us: i64,
    lookback_us: i64,
) -> Option<i64> {
    let raw = now.timestamp_micros().checked_sub(lookback_us)?;
    let start = raw.checked_sub(raw.rem_euclid(interval_us))?;
    DateTime::from_timestamp_micros(start).map(|_| start)
}

fn empty_buckets(
    now: DateTime<Utc>,
    start_us: i64,
    interval_us: i64,
    lookback: Duration,
) -> Option<Vec<TimeSeriesBucket>> {
    let interval = Duration::from_micros(interval_us.unsigned_abs());
    let count = usize::try_from(bucket_count(interval, lookback)).ok()?;
    let back = now.timestamp_micros().checked_sub(start_us)?;
    let start = now.checked_sub_signed(TimeDelta::microseconds(back))?;

    (0..count)
        .map(|i| {
            let offset = i64::try_from(i).ok()?.checked_mul(interval_us)?;
            let timestamp =
                start.checked_add_signed(TimeDelta::microseconds(offset))?;
            Some(TimeSeriesBucket {
                timestamp,
                request_count: 0,
                error_count: 0,
                avg_latency: Duration::ZERO,
            })
        })
        .collect()
}

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::metric;
    use chrono::TimeZone;

    const MINUTE: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);
    const DAY: Duration = Duration::from_secs(86_400);

    fn at(ts: DateTime<Utc>, status: u16, ms: u64) -> Arc<RequestMetric> {
        let mut m = metric("GET", "/x", status, ms);
        m.timestamp = ts;
        Arc::new(m)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 30, 42).unwrap()
    }

    fn hms(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn single_sample_lands_in_one_of_61_buckets() {
        let now = now();
        let samples = vec![at(now - TimeDelta::minutes(10), 200, 5)];

        let buckets = build(&samples, now, MINUTE, HOUR);

        assert_eq!(buckets.len(), 61);
        let hit: Vec<_> =
            buckets.iter().filter(|b| b.request_count > 0).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].request_count, 1);
        assert_eq!(hit[0].avg_latency, Duration::from_millis(5));
    }

    #[test]
    fn start_is_truncated_to_interval_boundary() {
        let buckets = build(&[], now(), MINUTE, HOUR);

        assert_eq!(buckets[0].timestamp, hms(11, 30, 0));
        assert_eq!(buckets[1].timestamp, hms(11, 31, 0));
        assert_eq!(buckets[60].timestamp, hms(12, 30, 0));
    }

    #[test]
    fn averages_and_errors_per_bucket() {
        let t = hms(12, 0, 10);
        let samples = vec![at(t, 200, 10), at(t, 500, 30)];

        let buckets = build(&samples, now(), MINUTE, HOUR);
        let b = buckets.iter().find(|b| b.request_count > 0).unwrap();

        assert_eq!(b.timestamp, hms(12, 0, 0));
        assert_eq!(b.request_count, 2);
        assert_eq!(b.error_count, 1);
        assert_eq!(b.avg_latency, Duration::from_millis(20));
    }

    #[test]
    fn ignores_samples_outside_window() {
        let now = now();
        let samples = vec![
            at(now - TimeDelta::hours(3), 200, 1),
            at(now + TimeDelta::seconds(1), 200, 1),
        ];

        let buckets = build(&samples, now, MINUTE, HOUR);
        assert!(buckets.iter().all(|b| b.request_count == 0));
        assert!(buckets.iter().all(|b| b.avg_latency == Duration::ZERO));
    }

    #[test]
    fn bucket_count_formula() {
        assert_eq!(bucket_count(MINUTE, HOUR), 61);
        assert_eq!(bucket_count(Duration::from_secs(300), HOUR), 13);
        assert_eq!(
            bucket_count(Duration::from_secs(7), Duration::from_secs(30)),
            5
        );
    }

    #[test]
    fn week_at_one_minute_keeps_its_interval() {
        assert_eq!(effective_interval(MINUTE, 7 * DAY), MINUTE);

        let buckets = build(&[], now(), MINUTE, 7 * DAY);
        assert_eq!(buckets.len(), 10_081);
    }

    #[test]
    fn oversized_window_widens_the_interval() {
        let interval = effective_interval(Duration::from_micros(1), 7 * DAY);
        assert!(interval > Duration::from_micros(1));
        assert!(bucket_count(interval, 7 * DAY) <= u128::from(MAX_BUCKETS));

        let now = now();
        let samples = vec![at(now - TimeDelta::days(2), 200, 1)];
        let buckets = build(&samples, now, Duration::from_nanos(1), 7 * DAY);
        assert!(buckets.len() as u64 <= MAX_BUCKETS);
        assert_eq!(buckets.iter().map(|b| b.request_count).sum::<u64>(), 1);
    }

    #[test]
    fn window_past_the_date_range_is_empty() {
        let huge = 100_000_000 * DAY;
        assert!(build(&[], now(), huge, huge).is_empty());
        assert!(build(&[], now(), MINUTE, Duration::MAX).is_empty());
    }
}
