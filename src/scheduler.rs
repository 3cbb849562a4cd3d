// src/scheduler.rs
//! Process lifecycle: run a session at startup, then on a fixed interval,
//! never two at once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::tracker::{SessionReport, Tracker};

#[derive(Debug)]
pub enum Trigger {
    Ran(SessionReport),
    /// A session was still running; this trigger was dropped.
    Skipped,
}

#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    running: AtomicBool,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

/// Clears the running flag however the session ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: AtomicBool::new(false),
            last_run: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start time of the most recent session that actually ran.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run.lock().map(|g| *g).unwrap_or(None)
    }

    fn try_begin(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    /// Run one session unless one is already in flight.
    pub async fn trigger(&self, tracker: &Tracker) -> Trigger {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("previous session still running; skipping this trigger");
            return Trigger::Skipped;
        };
        let started = Utc::now();
        if let Ok(mut g) = self.last_run.lock() {
            *g = Some(started);
        }
        Trigger::Ran(tracker.run_session().await)
    }

    /// Trigger immediately, then every `interval`, until `shutdown` resolves.
    /// Ticks that fall due while a session runs are skipped, not queued.
    pub async fn run_until<F>(&self, tracker: &Tracker, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested; scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.trigger(tracker).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_blocks_second_begin_and_releases_on_drop() {
        let s = Scheduler::new(Duration::from_secs(60));
        let g = s.try_begin().expect("first begin");
        assert!(s.is_running());
        assert!(s.try_begin().is_none());
        drop(g);
        assert!(!s.is_running());
        assert!(s.try_begin().is_some());
    }

    #[test]
    fn fresh_scheduler_has_no_last_run() {
        let s = Scheduler::new(Duration::from_secs(60));
        assert!(s.last_run().is_none());
        assert_eq!(s.interval(), Duration::from_secs(60));
    }
}
