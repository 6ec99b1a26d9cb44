//! Plan engine errors
//!
//! Every authorization check fails with its own variant and stable code —
//! distinct causes are never collapsed into a generic failure.

use std::path::PathBuf;

use warden_workspace::ContentHash;

use crate::document::PlanStatus;

/// Errors raised by plan parsing, storage, governance, and enforcement
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The referenced plan does not exist in the store
    #[error("plan not found: {reference}")]
    NotFound {
        /// The reference the caller supplied (id or hash)
        reference: String,
    },

    /// The plan exists but is not approved
    #[error("plan `{id}` is not approved (status: {status})")]
    NotApproved {
        /// Plan identifier
        id: String,
        /// Its current status
        status: PlanStatus,
    },

    /// On-disk plan bytes no longer match the recorded approval hash
    #[error("plan `{id}` content tampered: recorded {recorded}, recomputed {recomputed}")]
    TamperedContent {
        /// Plan identifier
        id: String,
        /// Hash recorded in the approval header
        recorded: ContentHash,
        /// Hash recomputed from the on-disk body
        recomputed: ContentHash,
    },

    /// Caller-supplied plan id does not match the loaded plan
    #[error("plan id mismatch: expected `{expected}`, got `{actual}`")]
    IdMismatch {
        /// Id the caller expected
        expected: String,
        /// Id actually loaded
        actual: String,
    },

    /// Caller-supplied plan hash does not match the loaded plan
    #[error("plan hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash the caller expected
        expected: ContentHash,
        /// Hash actually loaded
        actual: ContentHash,
    },

    /// Target path is outside the plan's allowlist
    #[error("plan `{id}` does not authorize path {path}")]
    PathNotAuthorized {
        /// Plan identifier
        id: String,
        /// The unauthorized target
        path: PathBuf,
    },

    /// No phase of the plan permits the requested operation
    #[error("plan `{id}` has no phase allowing operation `{op}`")]
    OperationNotAllowed {
        /// Plan identifier
        id: String,
        /// The requested operation
        op: String,
    },

    /// Bootstrap was requested after the one-time window closed
    #[error("bootstrap is disabled: a plan has already been approved")]
    BootstrapDisabled,

    /// The plan failed its own lint
    #[error("plan `{id}` fails lint with {count} violation(s): {first}")]
    LintFailed {
        /// Plan identifier
        id: String,
        /// Number of violations
        count: usize,
        /// First violation, for the error message
        first: String,
    },

    /// Plan text is not a valid plan document
    #[error("malformed plan: {message}")]
    Malformed {
        /// Parser diagnostics
        message: String,
    },

    /// An allowlist pattern cannot be compiled
    #[error("invalid allowlist pattern `{pattern}`: {message}")]
    AllowlistInvalid {
        /// The offending pattern
        pattern: String,
        /// Glob compiler diagnostics
        message: String,
    },

    /// IO error touching the plan store or governance record
    #[error("plan store io error at {path}: {source}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl PlanError {
    /// Stable machine-readable code, used in audit entries and refusals
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "PLAN_NOT_FOUND",
            Self::NotApproved { .. } => "PLAN_NOT_APPROVED",
            Self::TamperedContent { .. } => "PLAN_CONTENT_TAMPERED",
            Self::IdMismatch { .. } => "PLAN_ID_MISMATCH",
            Self::HashMismatch { .. } => "PLAN_HASH_MISMATCH",
            Self::PathNotAuthorized { .. } => "PLAN_PATH_UNAUTHORIZED",
            Self::OperationNotAllowed { .. } => "PLAN_OPERATION_FORBIDDEN",
            Self::BootstrapDisabled => "BOOTSTRAP_DISABLED",
            Self::LintFailed { .. } => "PLAN_LINT_FAILED",
            Self::Malformed { .. } => "PLAN_MALFORMED",
            Self::AllowlistInvalid { .. } => "PLAN_ALLOWLIST_INVALID",
            Self::Io { .. } => "PLAN_STORE_IO",
        }
    }

    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error indicates tampering rather than a caller mistake
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(self, Self::TamperedContent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_per_variant() {
        let not_found = PlanError::NotFound {
            reference: "x".into(),
        };
        let not_approved = PlanError::NotApproved {
            id: "x".into(),
            status: PlanStatus::Pending,
        };
        assert_ne!(not_found.code(), not_approved.code());
        assert_eq!(not_found.code(), "PLAN_NOT_FOUND");
    }

    #[test]
    fn tampered_content_is_integrity() {
        let err = PlanError::TamperedContent {
            id: "x".into(),
            recorded: warden_workspace::ContentHash::compute(b"a"),
            recomputed: warden_workspace::ContentHash::compute(b"b"),
        };
        assert!(err.is_integrity());
        assert!(!PlanError::BootstrapDisabled.is_integrity());
    }
}
