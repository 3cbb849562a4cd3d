// src/tracker.rs
//! # Tracking session
//! One pass of collect → filter → notify.
//!
//! Failure policy per stage:
//! - a failing board is logged and skipped; other boards still run;
//! - a failing store write leaves that posting unseen, so the next session
//!   retries it;
//! - a failing notification does not roll back the seen-set (at most once
//!   delivery: no duplicate digests, a lost email is not resent).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::categorize::{CategoryRules, TitleFilter};
use crate::collect::{Collector, SearchQuery};
use crate::digest::DigestBuilder;
use crate::notify::Notifier;
use crate::posting::Posting;
use crate::store::SeenStore;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    Idle = 0,
    Collecting = 1,
    Filtering = 2,
    Notifying = 3,
}

impl SessionPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionPhase::Collecting,
            2 => SessionPhase::Filtering,
            3 => SessionPhase::Notifying,
            _ => SessionPhase::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Nothing new, so nothing was sent.
    Skipped,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Cards returned by collectors, before any filtering.
    pub collected: usize,
    /// Dropped by a title filter.
    pub filtered: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub collector_errors: usize,
    pub store_errors: usize,
    pub new_postings: Vec<Posting>,
    pub notification: NotifyOutcome,
}

impl SessionReport {
    fn empty() -> Self {
        Self {
            collected: 0,
            filtered: 0,
            invalid: 0,
            duplicates: 0,
            collector_errors: 0,
            store_errors: 0,
            new_postings: Vec::new(),
            notification: NotifyOutcome::Skipped,
        }
    }
}

/// Randomized pause between board fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn pick(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let ms = rand::rng().random_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(ms as u64)
    }
}

/// A search plus the board keys it should run on.
#[derive(Debug, Clone)]
pub struct Search {
    pub query: SearchQuery,
    pub sources: Vec<String>,
    /// Applied on top of the tracker-wide filter.
    pub filter: TitleFilter,
}

impl Search {
    pub fn new(query: SearchQuery, sources: Vec<String>) -> Self {
        Self {
            query,
            sources,
            filter: TitleFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: TitleFilter) -> Self {
        self.filter = filter;
        self
    }
}

pub struct Tracker {
    searches: Vec<Search>,
    collectors: BTreeMap<String, Arc<dyn Collector>>,
    store: Arc<dyn SeenStore>,
    notifier: Arc<dyn Notifier>,
    rules: CategoryRules,
    title_filter: TitleFilter,
    outreach_template: Option<String>,
    recipient: String,
    pacing: Pacing,
    limit: usize,
    phase: AtomicU8,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn SeenStore>,
        notifier: Arc<dyn Notifier>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            searches: Vec::new(),
            collectors: BTreeMap::new(),
            store,
            notifier,
            rules: CategoryRules::default(),
            title_filter: TitleFilter::default(),
            outreach_template: None,
            recipient: recipient.into(),
            pacing: Pacing::none(),
            limit: 15,
            phase: AtomicU8::new(SessionPhase::Idle as u8),
        }
    }

    /// Register a collector under a case-insensitive source key.
    pub fn with_collector(mut self, key: &str, collector: Arc<dyn Collector>) -> Self {
        self.collectors
            .insert(key.trim().to_ascii_lowercase(), collector);
        self
    }

    pub fn with_search(mut self, search: Search) -> Self {
        self.searches.push(search);
        self
    }

    pub fn with_rules(mut self, rules: CategoryRules) -> Self {
        self.rules = rules;
        self
    }

    /// Filter applied to every search's results.
    pub fn with_title_filter(mut self, filter: TitleFilter) -> Self {
        self.title_filter = filter;
        self
    }

    /// Per-posting outreach note in the digest; see [`DigestBuilder::with_outreach`].
    pub fn with_outreach_template(mut self, template: impl Into<String>) -> Self {
        self.outreach_template = Some(template.into());
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn store(&self) -> &Arc<dyn SeenStore> {
        &self.store
    }

    fn enter(&self, phase: SessionPhase) {
        self.phase.store(phase as u8, Ordering::Release);
        debug!(?phase, "session phase");
    }

    /// Run one full session. Never fails; problems are logged and counted.
    pub async fn run_session(&self) -> SessionReport {
        ensure_metrics_described();
        info!(searches = self.searches.len(), "starting tracking session");
        let mut report = SessionReport::empty();

        self.enter(SessionPhase::Collecting);
        let raw = self.collect_all(&mut report).await;

        self.enter(SessionPhase::Filtering);
        self.filter_new(raw, &mut report).await;

        if report.new_postings.is_empty() {
            info!(
                collected = report.collected,
                duplicates = report.duplicates,
                "no new postings in this session"
            );
        } else {
            self.enter(SessionPhase::Notifying);
            report.notification = self.notify(&report.new_postings).await;
        }

        self.enter(SessionPhase::Idle);
        gauge!("tracker_last_session_ts").set(Utc::now().timestamp() as f64);
        info!(
            collected = report.collected,
            filtered = report.filtered,
            invalid = report.invalid,
            duplicates = report.duplicates,
            new = report.new_postings.len(),
            collector_errors = report.collector_errors,
            store_errors = report.store_errors,
            notification = ?report.notification,
            "tracking session finished"
        );
        report
    }

    async fn collect_all(&self, report: &mut SessionReport) -> Vec<Posting> {
        let mut raw = Vec::new();
        let mut fetched_any = false;

        for search in &self.searches {
            let location = if search.query.location.is_empty() {
                "all locations"
            } else {
                search.query.location.as_str()
            };
            info!(query = %search.query.query, location, "searching");
            let filter = self.title_filter.merged(&search.filter);

            for key in &search.sources {
                let Some(collector) = self.collectors.get(&key.to_ascii_lowercase()) else {
                    warn!(source = %key, "no collector registered for source; skipping");
                    continue;
                };

                if fetched_any {
                    let pause = self.pacing.pick();
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                }
                fetched_any = true;

                match collector.collect(&search.query, self.limit).await {
                    Ok(mut v) => {
                        let cards = v.len();
                        report.collected += cards;
                        if !filter.is_empty() {
                            v.retain(|p| filter.allows(&p.title));
                        }
                        let dropped = cards - v.len();
                        if dropped > 0 {
                            report.filtered += dropped;
                            counter!("tracker_filtered_total").increment(dropped as u64);
                        }
                        debug!(source = collector.name(), cards, kept = v.len(), "collected");
                        raw.append(&mut v);
                    }
                    Err(e) => {
                        report.collector_errors += 1;
                        counter!("collector_errors_total", "source" => key.clone()).increment(1);
                        warn!(error = %e, source = collector.name(), query = %search.query.query, "collector failed");
                    }
                }
            }
        }
        raw
    }

    async fn filter_new(&self, raw: Vec<Posting>, report: &mut SessionReport) {
        for posting in raw {
            if !posting.is_valid() {
                report.invalid += 1;
                counter!("tracker_invalid_total").increment(1);
                continue;
            }

            let fp = posting.fingerprint();
            if self.store.exists(&fp).await {
                report.duplicates += 1;
                counter!("tracker_duplicate_total").increment(1);
                continue;
            }

            match self.store.add(&posting).await {
                Ok(true) => {
                    counter!("tracker_new_total").increment(1);
                    info!(
                        title = %posting.title,
                        company = %posting.company,
                        source = %posting.source,
                        "new posting"
                    );
                    report.new_postings.push(posting);
                }
                Ok(false) => {
                    report.duplicates += 1;
                    counter!("tracker_duplicate_total").increment(1);
                }
                Err(e) => {
                    report.store_errors += 1;
                    counter!("store_errors_total").increment(1);
                    error!(error = %e, fingerprint = %fp, "could not record posting; will retry next session");
                }
            }
        }
    }

    async fn notify(&self, postings: &[Posting]) -> NotifyOutcome {
        let digest = DigestBuilder::new(&self.rules)
            .with_outreach(self.outreach_template.as_deref())
            .build(postings, Utc::now());
        match self.notifier.send(&self.recipient, &digest).await {
            Ok(()) => {
                counter!("notify_sent_total").increment(1);
                info!(
                    notifier = self.notifier.name(),
                    total = digest.total,
                    counts = ?digest.counts,
                    "digest delivered"
                );
                NotifyOutcome::Sent
            }
            Err(e) => {
                counter!("notify_failures_total").increment(1);
                error!(error = %e, notifier = self.notifier.name(), "failed to send digest");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}
