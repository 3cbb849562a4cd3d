// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

/// Compact logs by default, JSON lines with `LOG_FORMAT=json`.
/// Filter comes from `RUST_LOG`, falling back to `jobwatch=info,warn`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobwatch=info,warn"));

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collector_postings_total",
            "Raw postings parsed from job boards."
        );
        describe_counter!(
            "collector_errors_total",
            "Board fetch/parse failures (per source)."
        );
        describe_histogram!("collector_fetch_ms", "Board fetch + parse time in milliseconds.");
        describe_counter!(
            "tracker_invalid_total",
            "Postings dropped for missing title/company."
        );
        describe_counter!(
            "tracker_duplicate_total",
            "Postings already present in the seen-set."
        );
        describe_counter!("tracker_filtered_total", "Postings dropped by title filters.");
        describe_counter!("tracker_new_total", "Postings newly added to the seen-set.");
        describe_counter!("store_errors_total", "Seen-store write failures.");
        describe_counter!("notify_sent_total", "Digests delivered.");
        describe_counter!("notify_failures_total", "Digest deliveries that failed.");
        describe_gauge!(
            "tracker_last_session_ts",
            "Unix ts when the last tracking session finished."
        );
    });
}

/// Serve Prometheus metrics on `$METRICS_ADDR` when set. Must run inside the
/// tokio runtime.
pub fn install_metrics_exporter() -> Result<Option<SocketAddr>> {
    let Ok(raw) = std::env::var(ENV_METRICS_ADDR) else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .trim()
        .parse()
        .with_context(|| format!("{ENV_METRICS_ADDR} is not a socket address: {raw}"))?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    Ok(Some(addr))
}
