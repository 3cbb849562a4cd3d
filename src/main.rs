//! jobwatch binary entrypoint.
//! Loads `.env` and config, installs logging/metrics, then tracks job boards
//! until Ctrl-C.

use jobwatch::{app, config::AppConfig, telemetry};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();
    if let Some(addr) = telemetry::install_metrics_exporter()? {
        tracing::info!(%addr, "prometheus exporter listening");
    }

    let cfg = AppConfig::load_default()?;
    app::run(cfg, shutdown_signal()).await
}
