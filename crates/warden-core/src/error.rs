//! Gate error taxonomy
//!
//! Every refusal names the gate that produced it and carries a stable
//! machine-readable code. The taxonomy is deliberately flat: five
//! failure classes plus the two session-level refusals, never collapsed
//! into a generic error string.

use warden_plan::PlanError;
use warden_policy::PolicyViolation;

fn describe_violations(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error raised by the write orchestrator or the operations surface
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The session context was never fetched
    #[error("gate context: fetch_context must run before any mutating operation")]
    ContextRequired,

    /// The session tripwire is engaged after a prior hard failure
    #[error("tripwire engaged by {code}: mutating operations are suspended until reset")]
    TripwireEngaged {
        /// Code of the failure that engaged the tripwire
        code: String,
    },

    /// The request itself is malformed
    #[error("gate {gate}: {message}")]
    Validation {
        /// Gate that refused
        gate: &'static str,
        /// What was wrong with the request
        message: String,
    },

    /// Plan enforcement refused the request
    #[error("gate {gate}: {source}")]
    Authorization {
        /// Gate that refused
        gate: &'static str,
        /// Underlying plan failure
        #[source]
        source: PlanError,
    },

    /// Static policy scan found violations in the proposed content
    #[error("gate {gate}: {} policy violation(s): {}", violations.len(), describe_violations(violations))]
    Policy {
        /// Gate that refused
        gate: &'static str,
        /// Every violation found, in scan order
        violations: Vec<PolicyViolation>,
    },

    /// Observed workspace state diverged from what the caller last saw
    #[error("gate {gate}: {message}")]
    Integrity {
        /// Gate that refused
        gate: &'static str,
        /// What diverged
        message: String,
    },

    /// A post-write verification step failed and the mutation was reverted
    #[error("gate {gate}: preflight step '{step}' failed: {message}")]
    Preflight {
        /// Gate that refused
        gate: &'static str,
        /// Name of the failing step
        step: String,
        /// Step diagnostics
        message: String,
    },

    /// The gatekeeper's own machinery failed
    #[error("gate {gate}: {message}")]
    Infrastructure {
        /// Gate that failed
        gate: &'static str,
        /// Stable code of the underlying failure
        code: &'static str,
        /// Failure diagnostics
        message: String,
    },
}

impl GateError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContextRequired => "CONTEXT_REQUIRED",
            Self::TripwireEngaged { .. } => "TRIPWIRE_ENGAGED",
            Self::Validation { .. } => "REQUEST_INVALID",
            Self::Authorization { source, .. } => source.code(),
            Self::Policy { .. } => "POLICY_VIOLATION",
            Self::Integrity { .. } => "CONTENT_DRIFT",
            Self::Preflight { .. } => "PREFLIGHT_FAILED",
            Self::Infrastructure { code, .. } => code,
        }
    }

    /// Whether this failure engages the session tripwire
    ///
    /// Request-shape and authorization refusals are expected operational
    /// outcomes; policy, integrity, preflight, and infrastructure failures
    /// suspend further mutation until an operator resets the session.
    #[must_use]
    pub const fn trips_tripwire(&self) -> bool {
        matches!(
            self,
            Self::Policy { .. }
                | Self::Integrity { .. }
                | Self::Preflight { .. }
                | Self::Infrastructure { .. }
        )
    }

    /// Wrap a plan failure, attributing it to `gate`
    #[must_use]
    pub fn plan(gate: &'static str, source: PlanError) -> Self {
        if source.is_integrity() {
            Self::Integrity {
                gate,
                message: source.to_string(),
            }
        } else {
            Self::Authorization { gate, source }
        }
    }

    /// Wrap an audit failure, attributing it to `gate`
    #[must_use]
    pub fn audit(gate: &'static str, source: &warden_audit::AuditError) -> Self {
        Self::Infrastructure {
            gate,
            code: source.code(),
            message: source.to_string(),
        }
    }

    /// Wrap an IO failure, attributing it to `gate`
    #[must_use]
    pub fn io(gate: &'static str, source: &std::io::Error) -> Self {
        Self::Infrastructure {
            gate,
            code: "INFRA_IO",
            message: source.to_string(),
        }
    }
}
