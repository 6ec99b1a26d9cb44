//! Warden audit ledger
//!
//! Every authorization attempt — accepted or refused — is appended to a
//! tamper-evident, hash-chained JSONL log under the workspace audit
//! directory. Each entry embeds the hash of its predecessor (the first
//! carries the `GENESIS` sentinel), so a retroactive edit anywhere breaks the
//! chain at a verifiable sequence number.
//!
//! # Guarantees
//!
//! - **Single writer**: appends take an exclusive advisory file lock with
//!   bounded retries; exhaustion is fatal to the caller's operation, never
//!   swallowed.
//! - **Redaction before hashing**: secret-shaped keys and values are replaced
//!   before digests are computed, so persisted hashes never depend on
//!   unredacted material.
//! - **No partial reads**: one unparsable line fails the whole read;
//!   [`AuditLedger::verify`] always returns a full report instead.

pub mod entry;
pub mod error;
pub mod ledger;
pub mod redact;

pub use entry::{AuditEntry, AuditRecord, Outcome, GENESIS};
pub use error::AuditError;
pub use ledger::{
    AuditLedger, FailureCategory, IntegrityFailure, IntegrityReport, IntegrityStatus, LockPolicy,
};
pub use redact::{digest_redacted, redact_value, REDACTED};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
