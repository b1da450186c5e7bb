use clap::Parser;
use std::time::Duration;

/// Runtime configuration. Every flag can also be set from the environment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fhir-usage-analytics",
    version,
    about = "In-process API usage analytics"
)]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "ANALYTICS_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Ring-buffer capacity; values <= 0 fall back to 100000
    #[arg(
        long,
        env = "ANALYTICS_CAPACITY",
        default_value_t = 100_000,
        allow_negative_numbers = true
    )]
    pub capacity: i64,

    /// Push period of the /analytics/stream feed (ms); 0 falls back to 1000
    #[arg(long, env = "ANALYTICS_STREAM_INTERVAL_MS", default_value_t = 1_000)]
    pub stream_interval_ms: u64,

    /// Synthetic requests to seed into the tracker at startup
    #[arg(long, env = "ANALYTICS_DEMO_REQUESTS", default_value_t = 0)]
    pub demo_requests: u64,

    /// Header carrying the caller identifier
    #[arg(
        long,
        env = "ANALYTICS_CLIENT_HEADER",
        default_value = "x-client-id"
    )]
    pub client_header: String,

    /// Header carrying the tenant identifier
    #[arg(
        long,
        env = "ANALYTICS_TENANT_HEADER",
        default_value = "x-tenant-id"
    )]
    pub tenant_header: String,
}

impl Config {
    pub fn stream_interval(&self) -> Duration {
        match self.stream_interval_ms {
            0 => Duration::from_millis(1_000),
            ms => Duration::from_millis(ms),
        }
    }
}

/// Same values as the flag defaults, without consulting the environment.
impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
            capacity: 100_000,
            stream_interval_ms: 1_000,
            demo_requests: 0,
            client_header: "x-client-id".into(),
            tenant_header: "x-tenant-id".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::parse_from(["x"]);
        assert_eq!(c.bind, "0.0.0.0:3000");
        assert_eq!(c.capacity, 100_000);
        assert_eq!(c.client_header, "x-client-id");
        assert_eq!(c.stream_interval(), Duration::from_secs(1));
    }

    #[test]
    fn default_ignores_environment() {
        std::env::set_var("ANALYTICS_TENANT_HEADER", "x-org");
        let c = Config::default();
        std::env::remove_var("ANALYTICS_TENANT_HEADER");

        assert_eq!(c.tenant_header, "x-tenant-id");
        assert_eq!(c.capacity, 100_000);
        assert_eq!(c.stream_interval(), Duration::from_secs(1));
    }

    #[test]
    fn flags_override() {
        let c = Config::parse_from([
            "x",
            "--capacity",
            "-1",
            "--stream-interval-ms",
            "0",
            "--demo-requests",
            "50",
        ]);
        assert_eq!(c.capacity, -1);
        assert_eq!(c.demo_requests, 50);
        assert_eq!(c.stream_interval(), Duration::from_secs(1));
    }
}
