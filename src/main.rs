use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod analytics;
mod config;
mod demo;
mod handlers;
mod middleware;
mod server;

use analytics::UsageTracker;
use config::Config;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Usage aggregator — the middleware records into it, handlers query it.
    pub tracker: Arc<UsageTracker>,

    /// Resolved runtime configuration.
    pub config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // ── 1. Logging ───────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 2. Tracker ───────────────────────────────────────────────
    let tracker = Arc::new(UsageTracker::new(config.capacity));
    info!(capacity = tracker.capacity(), "usage tracker ready");

    // ── 3. Optional demo traffic ─────────────────────────────────
    if config.demo_requests > 0 {
        demo::seed(&tracker, config.demo_requests);
    }

    // ── 4. Build shared state + router ───────────────────────────
    let addr = config.bind.clone();
    let state = Arc::new(AppState { tracker, config });
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "analytics listening");
    info!("overview → http://{addr}/analytics/overview");
    info!("stream   → http://{addr}/analytics/stream");

    axum::serve(listener, app)
        .await
        .context("server exited with error")
}
