use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use std::time::{Duration, Instant};
use tracing::info;

use crate::analytics::{extract_resource_type, RequestMetric, UsageTracker};

// ─── Pools ───────────────────────────────────────────────────────

static RESOURCES: &[&str] = &[
    "Patient",
    "Encounter",
    "Observation",
    "Condition",
    "MedicationRequest",
    "Practitioner",
    "Subscription",
];

static CLIENTS: &[&str] = &[
    "ehr-portal",
    "mobile-app",
    "lab-sync",
    "billing",
    "analytics-etl",
];

static TENANTS: &[&str] = &["clinic-north", "clinic-south", "hospital-main"];

/// Non-FHIR paths mixed into the traffic, no resource type
static OTHER_PATHS: &[&str] = &["/health", "/api/v1/users", "/metadata"];

// ─── Public entry point ──────────────────────────────────────────

/// Pushes `count` synthetic requests spread over the past hour through
/// the normal recording path. Deterministic for a given count.
pub fn seed(tracker: &UsageTracker, count: u64) {
    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..count {
        tracker.record(synthetic_metric(&mut rng));
    }

    let elapsed_ms = t0.elapsed().as_millis() as u64;
    info!(count, elapsed_ms, "demo traffic seeded");
}

// ─── Generator ───────────────────────────────────────────────────

fn synthetic_metric(rng: &mut StdRng) -> RequestMetric {
    let (method, path) = synthetic_request(rng);

    let status = if rng.gen_bool(0.05) {
        *[400u16, 401, 404, 409, 500, 503].choose(rng).unwrap_or(&500)
    } else {
        match method {
            "POST" => 201,
            "DELETE" => 204,
            _ => 200,
        }
    };

    // Mostly fast, with a slow tail
    let latency_ms = if rng.gen_bool(0.05) {
        rng.gen_range(100..800)
    } else {
        rng.gen_range(2..40)
    };

    let age = chrono::Duration::seconds(rng.gen_range(0..3600));
    let client_id = if rng.gen_bool(0.9) {
        CLIENTS.choose(rng).copied().unwrap_or_default().to_owned()
    } else {
        String::new()
    };

    RequestMetric {
        timestamp: Utc::now() - age,
        resource_type: extract_resource_type(&path),
        method: method.to_owned(),
        path,
        status_code: status,
        duration: Duration::from_millis(latency_ms),
        client_id,
        tenant_id: TENANTS.choose(rng).copied().unwrap_or_default().to_owned(),
        request_size: if method == "GET" { 0 } else { rng.gen_range(200..4_000) },
        response_size: rng.gen_range(100..20_000),
    }
}

/// Picks a method and a matching path shape.
fn synthetic_request(rng: &mut StdRng) -> (&'static str, String) {
    if rng.gen_bool(0.1) {
        let path = OTHER_PATHS.choose(rng).copied().unwrap_or("/health");
        return ("GET", path.to_owned());
    }

    let resource = RESOURCES.choose(rng).copied().unwrap_or("Patient");
    let id = rng.gen_range(1..10_000);

    match rng.gen_range(0u8..100) {
        0..=44 => ("GET", format!("/fhir/{resource}/{id}")),
        45..=74 => ("GET", format!("/fhir/{resource}")),
        75..=86 => ("POST", format!("/fhir/{resource}")),
        87..=92 => ("PUT", format!("/fhir/{resource}/{id}")),
        93..=95 => ("PATCH", format!("/fhir/{resource}/{id}")),
        _ => ("DELETE", format!("/fhir/{resource}/{id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_goes_through_record() {
        let tracker = UsageTracker::new(500);
        seed(&tracker, 1_000);

        let o = tracker.overview();
        assert_eq!(o.total_requests, 1_000);
        assert!(o.total_errors < 200);
        assert!(o.unique_clients <= CLIENTS.len());
        assert_eq!(tracker.retained(), 500);

        let resource_total: u64 = tracker.resources().iter().map(|r| r.total).sum();
        assert!(resource_total > 0 && resource_total < 1_000);
    }

    #[test]
    fn synthetic_paths_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let m = synthetic_metric(&mut rng);
            assert!(m.path.starts_with('/'));
            if m.path.starts_with("/fhir/") {
                assert!(RESOURCES.contains(&m.resource_type.as_str()));
            } else {
                assert!(m.resource_type.is_empty());
            }
        }
    }
}
