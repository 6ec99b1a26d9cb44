//! Plan enforcement
//!
//! The authorization check behind every write: load the referenced plan,
//! verify it is approved and untampered, honor any caller-supplied identity
//! expectations, and confirm the target path and operation are in scope.
//! Each check fails with its own code — they are never collapsed.

use std::path::Path;

use warden_workspace::ContentHash;

use crate::document::Plan;
use crate::error::PlanError;
use crate::store::{PlanRef, PlanStore};

/// Enforce a plan reference against a write target
///
/// `target` is the root-relative path being written. `expected_id` and
/// `expected_hash` are optional caller expectations; when supplied they are
/// always checked (strict mode — leniency is never silent).
///
/// # Errors
/// One distinct variant per failed check, in check order:
/// - [`PlanError::NotFound`] — no such plan
/// - [`PlanError::TamperedContent`] — on-disk bytes fail hash verification
/// - [`PlanError::NotApproved`] — plan exists but is pending or rejected
/// - [`PlanError::IdMismatch`] — caller expected a different plan id
/// - [`PlanError::HashMismatch`] — caller expected a different plan hash
/// - [`PlanError::PathNotAuthorized`] — target outside the allowlist
/// - [`PlanError::OperationNotAllowed`] — no phase permits `write`
pub fn enforce(
    store: &PlanStore,
    reference: &PlanRef,
    target: &Path,
    expected_id: Option<&str>,
    expected_hash: Option<ContentHash>,
) -> Result<Plan, PlanError> {
    let plan = store.load_by_ref(reference)?;

    if !plan.is_approved() {
        return Err(PlanError::NotApproved {
            id: plan.id().to_string(),
            status: plan.status(),
        });
    }

    if let Some(expected) = expected_id {
        if expected != plan.id() {
            return Err(PlanError::IdMismatch {
                expected: expected.to_string(),
                actual: plan.id().to_string(),
            });
        }
    }

    if let Some(expected) = expected_hash {
        if expected != plan.hash {
            return Err(PlanError::HashMismatch {
                expected,
                actual: plan.hash,
            });
        }
    }

    if !plan.authorizes_path(target)? {
        return Err(PlanError::PathNotAuthorized {
            id: plan.id().to_string(),
            path: target.to_path_buf(),
        });
    }

    if plan.phase_allowing("write").is_none() {
        return Err(PlanError::OperationNotAllowed {
            id: plan.id().to_string(),
            op: "write".to_string(),
        });
    }

    tracing::debug!(plan = %plan.id(), target = %target.display(), "plan enforcement passed");
    Ok(plan)
}
