// src/store.rs
//! Seen-set persistence.
//!
//! The seen-set is the only durable state of the tracker. `FileSeenStore`
//! keeps it as an append-only JSON-lines log: one line per reported posting,
//! written and fsynced before `add` returns, replayed into memory at open.
//! An insert writes one line no matter how large the log is, and existing
//! lines are never rewritten. Entries are never removed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::{
    fs::{self, File, OpenOptions},
    sync::Mutex,
};

use crate::posting::{Fingerprint, Posting};

pub const DEFAULT_STORE_PATH: &str = "state/seen_postings.jsonl";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("seen-store io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("seen-store file {path} is corrupt at line {line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize seen-store entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What we remember about a posting once it has been reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeenRecord {
    #[serde(flatten)]
    pub posting: Posting,
    pub first_seen: DateTime<Utc>,
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Raw lookup. Prefer [`SeenStore::exists`] in pipeline code.
    async fn try_exists(&self, fp: &Fingerprint) -> Result<bool, StoreError>;

    /// Atomic add-if-absent. `Ok(false)` means the fingerprint was already
    /// present, which is not an error.
    async fn add(&self, posting: &Posting) -> Result<bool, StoreError>;

    async fn len(&self) -> usize;

    /// Lookup that treats a failing read as "not seen", so a real posting is
    /// never dropped because of a storage hiccup.
    async fn exists(&self, fp: &Fingerprint) -> bool {
        match self.try_exists(fp).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, fingerprint = %fp, "seen-store lookup failed; treating as new");
                false
            }
        }
    }
}

/// One line of the log.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    fingerprint: Fingerprint,
    #[serde(flatten)]
    record: SeenRecord,
}

/// How the log ended when it was replayed.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    Clean,
    /// Last line parsed but has no trailing newline.
    Unterminated,
    /// Last line was cut short by a crash; bytes after `valid_len` are junk.
    Torn,
}

#[derive(Debug)]
struct Replay {
    seen: BTreeMap<Fingerprint, SeenRecord>,
    valid_len: u64,
    tail: Tail,
}

/// Rebuild the seen-set from raw log bytes. A bad line in the middle is
/// corruption; a bad unterminated last line is a torn write and is dropped.
fn replay(path: &Path, bytes: &[u8]) -> Result<Replay, StoreError> {
    let mut seen = BTreeMap::new();
    let mut valid_len = 0usize;
    let mut tail = Tail::Clean;

    for (idx, chunk) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
        let terminated = chunk.last() == Some(&b'\n');
        let line = chunk.trim_ascii();
        if line.is_empty() {
            valid_len += chunk.len();
            continue;
        }
        match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) => {
                seen.entry(entry.fingerprint).or_insert(entry.record);
                valid_len += chunk.len();
                if !terminated {
                    tail = Tail::Unterminated;
                }
            }
            Err(_) if !terminated => {
                tail = Tail::Torn;
                break;
            }
            Err(source) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })
            }
        }
    }
    Ok(Replay {
        seen,
        valid_len: valid_len as u64,
        tail,
    })
}

/// JSON-lines seen-set, replayed at open and appended on every add.
#[derive(Debug)]
pub struct FileSeenStore {
    path: PathBuf,
    seen: Mutex<BTreeMap<Fingerprint, SeenRecord>>,
}

impl FileSeenStore {
    /// Open the log at `path`, creating an empty one if the file is absent.
    /// A log with a bad line before its last one is reported, never
    /// rewritten.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let io = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(io(source)),
        };
        let existed = !bytes.is_empty();
        let replay = replay(&path, &bytes)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io)?;
        match replay.tail {
            Tail::Clean => {}
            Tail::Unterminated => {
                file.write_all(b"\n").await.map_err(io)?;
            }
            Tail::Torn => {
                tracing::warn!(
                    path = %path.display(),
                    dropped_bytes = bytes.len() as u64 - replay.valid_len,
                    "seen-store ends in a partial line; truncating it"
                );
                file.set_len(replay.valid_len).await.map_err(io)?;
            }
        }
        file.sync_all().await.map_err(io)?;

        if existed {
            tracing::info!(path = %path.display(), seen = replay.seen.len(), "loaded seen-store");
        } else {
            tracing::info!(path = %path.display(), "created empty seen-store");
        }
        Ok(Self {
            path,
            seen: Mutex::new(replay.seen),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First-seen record for a fingerprint, if any.
    pub async fn record(&self, fp: &Fingerprint) -> Option<SeenRecord> {
        self.seen.lock().await.get(fp).cloned()
    }

    /// Append one line and fsync it. On failure the file is cut back to its
    /// previous length so the next line starts clean.
    async fn append(&self, line: &[u8]) -> Result<(), StoreError> {
        let io = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(io)?;
        let committed = file.metadata().await.map_err(io)?.len();
        if let Err(e) = write_synced(&mut file, line).await {
            let _ = file.set_len(committed).await;
            return Err(io(e));
        }
        Ok(())
    }
}

async fn write_synced(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

#[async_trait]
impl SeenStore for FileSeenStore {
    async fn try_exists(&self, fp: &Fingerprint) -> Result<bool, StoreError> {
        Ok(self.seen.lock().await.contains_key(fp))
    }

    async fn add(&self, posting: &Posting) -> Result<bool, StoreError> {
        let fp = posting.fingerprint();
        let mut seen = self.seen.lock().await;
        if seen.contains_key(&fp) {
            return Ok(false);
        }
        let entry = LogEntry {
            fingerprint: fp,
            record: SeenRecord {
                posting: posting.clone(),
                first_seen: Utc::now(),
            },
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        // Not durable, so not seen: the next session retries it.
        self.append(&line).await?;
        seen.insert(entry.fingerprint, entry.record);
        Ok(true)
    }

    async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}

/// In-process seen-set with the same add-if-absent semantics.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<BTreeMap<Fingerprint, SeenRecord>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn try_exists(&self, fp: &Fingerprint) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.contains_key(fp))
    }

    async fn add(&self, posting: &Posting) -> Result<bool, StoreError> {
        let mut map = self.inner.lock().await;
        let fp = posting.fingerprint();
        if map.contains_key(&fp) {
            return Ok(false);
        }
        map.insert(
            fp,
            SeenRecord {
                posting: posting.clone(),
                first_seen: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
