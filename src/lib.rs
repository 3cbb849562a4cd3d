// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod app;
pub mod categorize;
pub mod collect;
pub mod config;
pub mod digest;
pub mod notify;
pub mod posting;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::categorize::{CategoryRule, CategoryRules, TitleFilter};
pub use crate::collect::{Collector, CollectorError, SearchQuery};
pub use crate::digest::{Digest, DigestBuilder};
pub use crate::notify::{Notifier, NotifyError};
pub use crate::posting::{Fingerprint, Posting};
pub use crate::scheduler::{Scheduler, Trigger};
pub use crate::store::{FileSeenStore, MemorySeenStore, SeenStore, StoreError};
pub use crate::tracker::{NotifyOutcome, Pacing, Search, SessionPhase, SessionReport, Tracker};
