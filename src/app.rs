// src/app.rs
//! Wiring from `AppConfig` to a ready-to-run `Tracker`.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::collect::sites::default_collectors;
use crate::config::AppConfig;
use crate::notify::{EmailSender, LogNotifier, Notifier};
use crate::scheduler::Scheduler;
use crate::store::{FileSeenStore, SeenStore};
use crate::tracker::{Pacing, Search, Tracker};

/// Pick SMTP when fully configured, otherwise log-only delivery.
pub fn build_notifier(cfg: &AppConfig) -> Result<Arc<dyn Notifier>> {
    match cfg.email.smtp_settings() {
        Some(smtp) => {
            let sender = EmailSender::new(&smtp).context("configuring SMTP notifier")?;
            info!(host = %smtp.host, port = smtp.port, tls = ?smtp.tls, "email notifications enabled");
            Ok(Arc::new(sender))
        }
        None => {
            warn!("SMTP not configured (need host, sender and SMTP_PASS); digests will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Build a tracker from config using the given store and notifier.
pub fn build_tracker(
    cfg: &AppConfig,
    store: Arc<dyn SeenStore>,
    notifier: Arc<dyn Notifier>,
) -> Result<Tracker> {
    let recipient = cfg.email.recipient().unwrap_or_default();
    let mut tracker = Tracker::new(store, notifier, recipient)
        .with_rules(cfg.category_rules())
        .with_title_filter(cfg.collector.title_filter())
        .with_limit(cfg.collector.limit)
        .with_pacing(Pacing::new(
            Duration::from_millis(cfg.schedule.pause_min_ms),
            Duration::from_millis(cfg.schedule.pause_max_ms),
        ));

    if let Some(t) = &cfg.digest.outreach_template {
        tracker = tracker.with_outreach_template(t.clone());
    }

    for (key, collector) in
        default_collectors(&cfg.collector.http_settings()).context("building collectors")?
    {
        tracker = tracker.with_collector(key, collector);
    }
    for s in &cfg.searches {
        tracker = tracker
            .with_search(Search::new(s.query(), s.sources.clone()).with_filter(s.title_filter()));
    }
    Ok(tracker)
}

/// Open the seen-store, build everything and run until `shutdown`.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()>,
{
    let store = FileSeenStore::open(&cfg.store.path)
        .await
        .with_context(|| format!("opening seen-store {}", cfg.store.path.display()))?;
    let store: Arc<dyn SeenStore> = Arc::new(store);
    let notifier = build_notifier(&cfg)?;
    let tracker = build_tracker(&cfg, store, notifier)?;

    info!(
        searches = cfg.searches.len(),
        interval_secs = cfg.schedule.interval_secs,
        "job tracker started"
    );
    let scheduler = Scheduler::new(cfg.schedule.interval());
    scheduler.run_until(&tracker, shutdown).await;
    Ok(())
}
