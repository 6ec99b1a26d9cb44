//! Governance state and the bootstrap escape hatch
//!
//! [`GovernanceState`] is the process-wide persisted singleton: whether the
//! one-time bootstrap window is still open, and how many plans have been
//! approved. It is mutated only here, on successful plan creation/approval.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use warden_workspace::WorkspaceRoot;

use crate::document::{
    Phase, Plan, PlanDocument, PlanMetadata, PlanScope, PlanStatus, Rollback, Verification,
};
use crate::error::PlanError;
use crate::store::{PlanRef, PlanStore};

/// Persisted governance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    /// True only until the first plan is ever approved, then permanently false
    pub bootstrap_enabled: bool,
    /// Number of plans approved so far
    pub approved_plan_count: u64,
}

impl Default for GovernanceState {
    fn default() -> Self {
        Self {
            bootstrap_enabled: true,
            approved_plan_count: 0,
        }
    }
}

impl GovernanceState {
    /// Load the record, defaulting if it has never been written
    ///
    /// # Errors
    /// Returns [`PlanError::Malformed`] for an unparsable record or an IO
    /// error reading it.
    pub fn load(root: &WorkspaceRoot) -> Result<Self, PlanError> {
        let path = root.governance_path();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| PlanError::io(&path, e))?;
        serde_json::from_str(&text).map_err(|e| PlanError::Malformed {
            message: format!("governance record: {e}"),
        })
    }

    /// Persist the record
    ///
    /// # Errors
    /// Returns an IO error writing the record.
    pub fn save(&self, root: &WorkspaceRoot) -> Result<(), PlanError> {
        let path = root.governance_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PlanError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| PlanError::Malformed {
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| PlanError::io(&path, e))
    }

    /// Record an approval: closes the bootstrap window permanently
    fn record_approval(&mut self) {
        self.bootstrap_enabled = false;
        self.approved_plan_count += 1;
    }
}

/// Create and immediately approve the very first plan
///
/// Only permitted while the bootstrap window is open; the window closes
/// permanently on success. The bootstrap plan's allowlist covers the whole
/// workspace — it is the chicken-and-egg escape hatch, and the only path to
/// an initial authorization.
///
/// # Errors
/// Returns [`PlanError::BootstrapDisabled`] once any plan has been approved,
/// or a lint/IO error from persistence.
pub fn bootstrap(
    root: &WorkspaceRoot,
    store: &PlanStore,
    description: &str,
    phases: Vec<Phase>,
) -> Result<Plan, PlanError> {
    let mut governance = GovernanceState::load(root)?;
    if !governance.bootstrap_enabled {
        return Err(PlanError::BootstrapDisabled);
    }

    let now = Utc::now();
    let phases = if phases.is_empty() {
        vec![Phase {
            id: "bootstrap-1".to_string(),
            objective: description.to_string(),
            allowed_ops: vec!["write".to_string()],
            forbidden_ops: Vec::new(),
            intent_artifacts: Vec::new(),
        }]
    } else {
        phases
    };

    let mut document = PlanDocument {
        approval: crate::document::Approval::default(),
        metadata: PlanMetadata {
            id: "bootstrap".to_string(),
            title: "Bootstrap plan".to_string(),
            description: description.to_string(),
            created_at: now,
        },
        scope: PlanScope {
            objective: description.to_string(),
            paths: vec!["**".to_string()],
        },
        phases,
        verification: Verification {
            gates: vec!["workspace preflight".to_string()],
        },
        rollback: Rollback {
            policy: "Revert tentative writes on preflight failure".to_string(),
        },
    };
    document.approval.status = PlanStatus::Approved;
    document.approval.approved_at = Some(now);

    let plan = store.save(document)?;
    governance.record_approval();
    governance.save(root)?;

    tracing::info!(hash = %plan.hash.short(), "bootstrap plan approved, window closed");
    Ok(plan)
}

/// Approve a stored plan
///
/// Sets the approval header, re-persists the plan (the body hash is
/// unchanged), and records the approval in governance state. Like bootstrap,
/// a first approval through this path closes the bootstrap window.
///
/// # Errors
/// Propagates load/persist failures with their distinct codes.
pub fn approve_plan(
    root: &WorkspaceRoot,
    store: &PlanStore,
    reference: &PlanRef,
) -> Result<Plan, PlanError> {
    let mut plan = store.load_by_ref(reference)?;
    if plan.is_approved() {
        return Ok(plan);
    }

    plan.document.approval.status = PlanStatus::Approved;
    plan.document.approval.approved_at = Some(Utc::now());
    let plan = store.save(plan.document)?;

    let mut governance = GovernanceState::load(root)?;
    governance.record_approval();
    governance.save(root)?;

    tracing::info!(plan = %plan.id(), "plan approved");
    Ok(plan)
}
