//! Audit entry model
//!
//! An [`AuditEntry`] is immutable once written. Its hash is computed over the
//! canonical JSON of the entry with the `hash` field emptied, so verification
//! can recompute it from the persisted record alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_workspace::ContentHash;

use crate::error::AuditError;

/// Sentinel `prev_hash` of the first entry in a log
pub const GENESIS: &str = "GENESIS";

/// Outcome of the audited operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The operation succeeded
    Ok,
    /// The operation was refused or failed
    Error,
}

/// The incoming payload for one audit append
///
/// Raw argument/result values are redacted and digested before persistence;
/// they never reach the log verbatim.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Actor or session identifier
    pub actor: String,
    /// Operation name (e.g. `write_file`)
    pub operation: String,
    /// Operation arguments (will be redacted and digested)
    pub args: serde_json::Value,
    /// Operation result (will be redacted and digested)
    pub result: serde_json::Value,
    /// Outcome of the attempt
    pub outcome: Outcome,
    /// Error code when the outcome is an error
    pub error_code: Option<String>,
    /// Free-text note
    pub note: String,
}

impl AuditRecord {
    /// Convenience constructor for a successful operation
    #[must_use]
    pub fn ok(actor: &str, operation: &str, args: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            actor: actor.to_string(),
            operation: operation.to_string(),
            args,
            result,
            outcome: Outcome::Ok,
            error_code: None,
            note: String::new(),
        }
    }

    /// Convenience constructor for a refused or failed operation
    #[must_use]
    pub fn error(actor: &str, operation: &str, args: serde_json::Value, code: &str, note: &str) -> Self {
        Self {
            actor: actor.to_string(),
            operation: operation.to_string(),
            args,
            result: serde_json::Value::Null,
            outcome: Outcome::Error,
            error_code: Some(code.to_string()),
            note: note.to_string(),
        }
    }

    /// Attach a note
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = note.to_string();
        self
    }
}

/// One immutable, hash-chained log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number, starting at 1
    pub seq: u64,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous entry, or [`GENESIS`] for the first
    pub prev_hash: String,
    /// Hash of this entry (computed with this field emptied)
    pub hash: String,
    /// Actor or session identifier
    pub actor: String,
    /// Operation name
    pub operation: String,
    /// Digest of the redacted arguments
    pub args_digest: ContentHash,
    /// Digest of the redacted result
    pub result_digest: ContentHash,
    /// Outcome of the attempt
    pub outcome: Outcome,
    /// Error code when the outcome is an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Free-text note
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl AuditEntry {
    /// Recompute this entry's hash from its canonical form
    ///
    /// # Errors
    /// Returns an encoding error if the entry cannot be serialized.
    pub fn compute_hash(&self) -> Result<String, AuditError> {
        let mut canonical = self.clone();
        canonical.hash = String::new();
        Ok(ContentHash::compute_serializable(&canonical)?.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AuditEntry {
        AuditEntry {
            seq: 1,
            timestamp: "2026-08-20T09:00:00Z".parse().unwrap(),
            prev_hash: GENESIS.to_string(),
            hash: String::new(),
            actor: "session-1".to_string(),
            operation: "write_file".to_string(),
            args_digest: ContentHash::compute(b"args"),
            result_digest: ContentHash::compute(b"result"),
            outcome: Outcome::Ok,
            error_code: None,
            note: String::new(),
        }
    }

    #[test]
    fn hash_excludes_the_hash_field() {
        let mut e = entry();
        let h1 = e.compute_hash().unwrap();
        e.hash = h1.clone();
        let h2 = e.compute_hash().unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_covers_every_other_field() {
        let base = entry().compute_hash().unwrap();
        let mut changed = entry();
        changed.operation = "bootstrap_plan".to_string();
        assert_ne!(base, changed.compute_hash().unwrap());
    }

    #[test]
    fn outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&Outcome::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn entry_roundtrips_through_json() {
        let mut e = entry();
        e.hash = e.compute_hash().unwrap();
        let line = serde_json::to_string(&e).unwrap();
        let back: AuditEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(e, back);
    }
}
