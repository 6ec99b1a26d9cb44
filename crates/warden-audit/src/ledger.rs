//! Append and verify
//!
//! The ledger serializes all appends with an exclusive advisory lock on a
//! file next to the log. The critical section spans "read last entry →
//! append new entry", which is what keeps sequence numbers and chain links
//! race-free across threads and processes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use fs2::FileExt;

use warden_workspace::WorkspaceRoot;

use crate::entry::{AuditEntry, AuditRecord, GENESIS};
use crate::error::AuditError;
use crate::redact::digest_redacted;

/// Lock acquisition policy: bounded retries with linear backoff
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    /// Maximum acquisition attempts before giving up
    pub attempts: u32,
    /// Base delay between attempts (multiplied by the attempt number)
    pub backoff: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            backoff: Duration::from_millis(15),
        }
    }
}

/// Category of one integrity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    /// Sequence numbers do not strictly increment from 1
    SequenceGap,
    /// Declared previous-hash does not match the prior entry's recomputed hash
    BrokenChain,
    /// Stored hash does not match the recomputed hash
    HashMismatch,
    /// The line does not parse as an entry
    Unparsable,
}

/// One integrity failure, located by sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IntegrityFailure {
    /// Sequence position of the failing entry (line number for unparsable lines)
    pub seq: u64,
    /// What went wrong there
    pub category: FailureCategory,
}

/// Overall status of a verification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    /// The log has no entries
    Empty,
    /// Every entry verified
    Valid,
    /// At least one failure
    Invalid,
}

/// Result of replaying the full log
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IntegrityReport {
    /// Whether the whole chain verified
    pub valid: bool,
    /// Overall status
    pub status: IntegrityStatus,
    /// Number of entries examined
    pub entries: u64,
    /// Every failure found, in log order
    pub failures: Vec<IntegrityFailure>,
}

impl IntegrityReport {
    fn empty() -> Self {
        Self {
            valid: true,
            status: IntegrityStatus::Empty,
            entries: 0,
            failures: Vec::new(),
        }
    }
}

/// The append-only audit ledger for one workspace
#[derive(Debug, Clone)]
pub struct AuditLedger {
    root: WorkspaceRoot,
    policy: LockPolicy,
}

impl AuditLedger {
    /// Create a ledger rooted at the locked workspace
    #[inline]
    #[must_use]
    pub fn new(root: WorkspaceRoot) -> Self {
        Self {
            root,
            policy: LockPolicy::default(),
        }
    }

    /// Override the lock policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: LockPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock_path(&self) -> PathBuf {
        self.root.audit_dir().join(".lock")
    }

    /// Append one record, returning the persisted entry
    ///
    /// Acquires the exclusive lock (bounded retries, then fatal), reads the
    /// last persisted entry for `seq`/`prev_hash`, redacts and digests the
    /// payloads, hashes the canonical entry, and appends exactly one line.
    ///
    /// # Errors
    /// [`AuditError::LockTimeout`] when the retry budget is exhausted, or an
    /// IO/encoding error. Any of these aborts the caller's operation.
    pub fn append(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let audit_dir = self.root.audit_dir();
        std::fs::create_dir_all(&audit_dir).map_err(|e| AuditError::io(&audit_dir, e))?;

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| AuditError::io(&lock_path, e))?;

        let mut acquired = false;
        for attempt in 1..=self.policy.attempts {
            match lock_file.try_lock_exclusive() {
                Ok(()) => {
                    acquired = true;
                    break;
                }
                Err(_) if attempt < self.policy.attempts => {
                    std::thread::sleep(self.policy.backoff * attempt);
                }
                Err(_) => {}
            }
        }
        if !acquired {
            return Err(AuditError::LockTimeout {
                attempts: self.policy.attempts,
            });
        }

        // Critical section: last-entry read and append stay under one lock.
        // The flock is released when `lock_file` drops, error paths included.
        let result = self.append_locked(record);
        if let Err(e) = &result {
            tracing::error!(error = %e, "audit append failed");
        }
        result
    }

    fn append_locked(&self, record: AuditRecord) -> Result<AuditEntry, AuditError> {
        let log_path = self.root.audit_log_path();

        let (seq, prev_hash) = match self.last_entry()? {
            Some(last) => (last.seq + 1, last.hash),
            None => (1, GENESIS.to_string()),
        };

        let mut entry = AuditEntry {
            seq,
            timestamp: chrono::Utc::now(),
            prev_hash,
            hash: String::new(),
            actor: record.actor,
            operation: record.operation,
            args_digest: digest_redacted(&record.args)?,
            result_digest: digest_redacted(&record.result)?,
            outcome: record.outcome,
            error_code: record.error_code,
            note: record.note,
        };
        entry.hash = entry.compute_hash()?;

        let line = serde_json::to_string(&entry)?;
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| AuditError::io(&log_path, e))?;
        writeln!(log, "{line}").map_err(|e| AuditError::io(&log_path, e))?;
        log.sync_all().map_err(|e| AuditError::io(&log_path, e))?;

        tracing::debug!(seq = entry.seq, operation = %entry.operation, "audit entry appended");
        Ok(entry)
    }

    fn last_entry(&self) -> Result<Option<AuditEntry>, AuditError> {
        let log_path = self.root.audit_log_path();
        if !log_path.is_file() {
            return Ok(None);
        }
        let text =
            std::fs::read_to_string(&log_path).map_err(|e| AuditError::io(&log_path, e))?;
        let mut last: Option<(usize, &str)> = None;
        for (index, candidate) in text.lines().enumerate() {
            if !candidate.trim().is_empty() {
                last = Some((index, candidate));
            }
        }
        let Some((line_no, line)) = last else {
            return Ok(None);
        };
        let entry = serde_json::from_str(line).map_err(|e| AuditError::CorruptEntry {
            line: line_no + 1,
            message: e.to_string(),
        })?;
        Ok(Some(entry))
    }

    /// All entries in append order
    ///
    /// # Errors
    /// A parse failure on any line is [`AuditError::CorruptEntry`] — never a
    /// partial result.
    pub fn read(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let log_path = self.root.audit_log_path();
        if !log_path.is_file() {
            return Ok(Vec::new());
        }
        let text =
            std::fs::read_to_string(&log_path).map_err(|e| AuditError::io(&log_path, e))?;

        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry =
                serde_json::from_str(line).map_err(|e| AuditError::CorruptEntry {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Replay the whole log and verify the chain
    ///
    /// Always returns a report; an unreadable log is reported, not raised.
    #[must_use]
    pub fn verify(&self) -> IntegrityReport {
        let log_path = self.root.audit_log_path();
        if !log_path.is_file() {
            return IntegrityReport::empty();
        }
        let text = match std::fs::read_to_string(&log_path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "audit log unreadable during verify");
                return IntegrityReport {
                    valid: false,
                    status: IntegrityStatus::Invalid,
                    entries: 0,
                    failures: vec![IntegrityFailure {
                        seq: 0,
                        category: FailureCategory::Unparsable,
                    }],
                };
            }
        };

        let mut failures = Vec::new();
        let mut entries: u64 = 0;
        let mut prev_recomputed: Option<String> = None;

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            entries += 1;
            let position = entries;

            let entry: AuditEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(_) => {
                    failures.push(IntegrityFailure {
                        seq: (index + 1) as u64,
                        category: FailureCategory::Unparsable,
                    });
                    prev_recomputed = None;
                    continue;
                }
            };

            if entry.seq != position {
                failures.push(IntegrityFailure {
                    seq: entry.seq,
                    category: FailureCategory::SequenceGap,
                });
            }

            match (&prev_recomputed, position) {
                (_, 1) => {
                    if entry.prev_hash != GENESIS {
                        failures.push(IntegrityFailure {
                            seq: entry.seq,
                            category: FailureCategory::BrokenChain,
                        });
                    }
                }
                (Some(prev), _) => {
                    if entry.prev_hash != *prev {
                        failures.push(IntegrityFailure {
                            seq: entry.seq,
                            category: FailureCategory::BrokenChain,
                        });
                    }
                }
                (None, _) => {}
            }

            match entry.compute_hash() {
                Ok(recomputed) => {
                    if recomputed != entry.hash {
                        failures.push(IntegrityFailure {
                            seq: entry.seq,
                            category: FailureCategory::HashMismatch,
                        });
                    }
                    prev_recomputed = Some(recomputed);
                }
                Err(_) => {
                    failures.push(IntegrityFailure {
                        seq: entry.seq,
                        category: FailureCategory::Unparsable,
                    });
                    prev_recomputed = None;
                }
            }
        }

        if entries == 0 {
            return IntegrityReport::empty();
        }
        let valid = failures.is_empty();
        IntegrityReport {
            valid,
            status: if valid {
                IntegrityStatus::Valid
            } else {
                IntegrityStatus::Invalid
            },
            entries,
            failures,
        }
    }
}
