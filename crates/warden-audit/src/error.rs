//! Audit ledger errors
//!
//! All of these are infrastructure-class failures: an audit error aborts the
//! caller's operation. There is no code path that downgrades one to a
//! warning.

use std::path::PathBuf;

/// Errors raised by the audit ledger
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Exclusive lock could not be acquired within the retry budget
    #[error("audit lock not acquired after {attempts} attempts")]
    LockTimeout {
        /// Number of attempts made
        attempts: u32,
    },

    /// IO error touching the audit directory or log
    #[error("audit io error at {path}: {source}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A persisted log line does not parse as an entry
    #[error("corrupt audit entry at line {line}: {message}")]
    CorruptEntry {
        /// 1-based line number in the log file
        line: usize,
        /// Parser diagnostics
        message: String,
    },

    /// An entry could not be canonically encoded for hashing
    #[error("audit encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Hash computation failed
    #[error("audit hash error: {0}")]
    Hash(#[from] warden_workspace::HashError),
}

impl AuditError {
    /// Stable machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LockTimeout { .. } => "AUDIT_LOCK_TIMEOUT",
            Self::Io { .. } => "AUDIT_IO",
            Self::CorruptEntry { .. } => "AUDIT_CORRUPT",
            Self::Encoding(_) => "AUDIT_ENCODING",
            Self::Hash(_) => "AUDIT_HASH",
        }
    }

    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
