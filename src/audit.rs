//! The append-only audit store, single source of truth for status
//! history.
//!
//! [`AuditStore`] owns the log exclusively: the only ways in are
//! [`AuditStore::append`] and the only way out is
//! [`AuditStore::snapshot`]. No update or delete operation exists.
//! Durability is a JSON-lines file: one serde record per line, written
//! and flushed before the record becomes visible to readers.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, ValidationError};

/// Red/Amber/Green classification. Only `Red` carries escalation
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RagStatus {
    Red,
    Amber,
    Green,
}

impl std::fmt::Display for RagStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RagStatus::Red => write!(f, "Red"),
            RagStatus::Amber => write!(f, "Amber"),
            RagStatus::Green => write!(f, "Green"),
        }
    }
}

impl std::str::FromStr for RagStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(RagStatus::Red),
            "amber" => Ok(RagStatus::Amber),
            "green" => Ok(RagStatus::Green),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Input to [`AuditStore::append`]: everything the caller supplies.
/// Sequence id and timestamp are assigned by the store at commit time.
#[derive(Debug, Clone)]
pub struct StatusDraft {
    pub employee_id: String,
    pub employee_name: String,
    pub status: RagStatus,
    pub comment: String,
}

/// One committed status assignment event. Immutable once returned by
/// [`AuditStore::append`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub sequence_id: u64,
    pub employee_id: String,
    pub employee_name: String,
    pub status: RagStatus,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

struct StoreInner {
    records: Vec<StatusRecord>,
    sink: Option<Box<dyn Write + Send + Sync>>,
    next_seq: u64,
}

/// Append-only, ordered log of [`StatusRecord`]s.
///
/// Appends are serialized behind the write lock, so sequence ids are
/// strictly increasing and gap-free and reflect commit order. Snapshots
/// take the read lock and observe either the pre- or post-append state,
/// never a partial record.
pub struct AuditStore {
    inner: RwLock<StoreInner>,
}

impl std::fmt::Debug for AuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStore").finish_non_exhaustive()
    }
}

impl AuditStore {
    /// Open a durable store backed by a JSON-lines file, loading any
    /// existing records and resuming the sequence counter.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let mut records = Vec::new();
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(PersistenceError::Read)?;
            for (idx, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: StatusRecord = serde_json::from_str(line)
                    .map_err(|source| PersistenceError::Corrupt {
                        line: idx + 1,
                        source,
                    })?;
                records.push(record);
            }
        }

        let sink = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(PersistenceError::Write)?;

        let next_seq = records.last().map(|r| r.sequence_id + 1).unwrap_or(1);
        log::info!(
            "audit store opened at {} ({} records, next sequence {next_seq})",
            path.display(),
            records.len()
        );

        Ok(Self {
            inner: RwLock::new(StoreInner {
                records,
                sink: Some(Box::new(sink)),
                next_seq,
            }),
        })
    }

    /// A store with no durable sink. Used by tests and demo mode.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                sink: None,
                next_seq: 1,
            }),
        }
    }

    /// A store whose sink fails the first `failures` writes, for
    /// exercising the storage-fault path.
    #[cfg(test)]
    pub(crate) fn with_sink_failures(failures: usize) -> Self {
        struct FlakySink {
            remaining: usize,
        }

        impl Write for FlakySink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if self.remaining > 0 {
                    self.remaining -= 1;
                    Err(std::io::Error::other("disk full"))
                } else {
                    Ok(buf.len())
                }
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        Self {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                sink: Some(Box::new(FlakySink {
                    remaining: failures,
                })),
                next_seq: 1,
            }),
        }
    }

    /// Commit a draft: assign the next sequence id and a timestamp,
    /// write it durably, and return the committed record.
    ///
    /// Fails only on a storage-layer fault; a failed append leaves the
    /// visible log untouched.
    pub fn append(&self, draft: StatusDraft) -> Result<StatusRecord, PersistenceError> {
        let mut inner = self.inner.write().expect("audit store lock poisoned");

        // Wall clocks can step backwards; keep created_at non-decreasing
        // in insertion order regardless.
        let mut created_at = Utc::now();
        if let Some(last) = inner.records.last()
            && created_at < last.created_at
        {
            created_at = last.created_at;
        }

        let record = StatusRecord {
            sequence_id: inner.next_seq,
            employee_id: draft.employee_id,
            employee_name: draft.employee_name,
            status: draft.status,
            comment: draft.comment,
            created_at,
        };

        if let Some(sink) = inner.sink.as_mut() {
            let mut line =
                serde_json::to_string(&record).map_err(PersistenceError::Encode)?;
            line.push('\n');
            sink.write_all(line.as_bytes())
                .and_then(|_| sink.flush())
                .map_err(PersistenceError::Write)?;
        }

        inner.next_seq += 1;
        inner.records.push(record.clone());
        log::info!(
            "audit record #{} committed: {} -> {}",
            record.sequence_id,
            record.employee_id,
            record.status
        );
        Ok(record)
    }

    /// Point-in-time copy of the log, in insertion order.
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        self.inner
            .read()
            .expect("audit store lock poisoned")
            .records
            .clone()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("audit store lock poisoned")
            .records
            .len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
