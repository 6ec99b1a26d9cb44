//! Operations surface
//!
//! Every externally-invokable operation of the gatekeeper. Mutating
//! operations (`write_file`, `bootstrap_plan`) are tripwire-checked and
//! always audited, refusals included; `read_audit_log` and
//! `verify_workspace_integrity` stay available while the tripwire is
//! engaged, so a suspended session can still be examined.

use serde_json::json;

use warden_audit::{AuditEntry, AuditRecord, IntegrityReport};
use warden_plan::{bootstrap, lint, Phase, Plan, PlanRef, PlanSummary};
use warden_policy::PolicyViolation;

use crate::error::GateError;
use crate::orchestrator::{run_gates, WriteReceipt, WriteRequest};
use crate::session::Session;

/// What to lint in [`lint_plan`]
#[derive(Debug, Clone)]
pub enum LintSource {
    /// Raw plan text
    Text(String),
    /// A plan file on disk (absolute or cwd-relative; not resolved)
    File(std::path::PathBuf),
    /// A plan already in the store
    Stored(PlanRef),
}

fn audit_attempt(
    session: &Session,
    operation: &str,
    args: serde_json::Value,
    outcome: Result<serde_json::Value, &GateError>,
) -> Result<AuditEntry, GateError> {
    let record = match outcome {
        Ok(result) => AuditRecord::ok(session.actor(), operation, args, result),
        Err(e) => AuditRecord::error(session.actor(), operation, args, e.code(), &e.to_string()),
    };
    session.ledger().append(record).map_err(|e| {
        // An unrecordable mutation is a failed mutation.
        let err = GateError::audit("audit", &e);
        session.trip(err.code());
        err
    })
}

fn check_tripwire(session: &Session) -> Result<(), GateError> {
    match session.tripwire() {
        Some(code) => Err(GateError::TripwireEngaged { code }),
        None => Ok(()),
    }
}

/// Write one file through the full gate pipeline
///
/// Every attempt is audited, including refusals; a policy, integrity,
/// preflight, or infrastructure failure engages the tripwire.
///
/// # Errors
/// Any gate refusal, or an audit failure (which is itself fatal).
pub fn write_file(session: &Session, request: WriteRequest) -> Result<WriteReceipt, GateError> {
    let args = json!({
        "path": request.path.display().to_string(),
        "plan": request.plan.to_string(),
    });

    if let Err(e) = check_tripwire(session) {
        audit_attempt(session, "write_file", args, Err(&e))?;
        return Err(e);
    }

    match run_gates(session, &request) {
        Ok(mutation) => {
            let result = json!({
                "path": mutation.relative.display().to_string(),
                "new_hash": mutation.new_hash.to_hex(),
                "plan": mutation.plan_id,
            });
            let entry = audit_attempt(session, "write_file", args, Ok(result))?;
            Ok(WriteReceipt {
                path: mutation.relative,
                new_hash: mutation.new_hash,
                plan_id: mutation.plan_id,
                audit_seq: entry.seq,
            })
        }
        Err(e) => {
            if e.trips_tripwire() {
                session.trip(e.code());
            }
            audit_attempt(session, "write_file", args, Err(&e))?;
            Err(e)
        }
    }
}

/// Create and approve the one-time bootstrap plan
///
/// # Errors
/// Refused under tripwire or after the bootstrap window has closed.
pub fn bootstrap_plan(
    session: &Session,
    description: &str,
    phases: Vec<Phase>,
) -> Result<Plan, GateError> {
    let args = json!({ "description": description });

    if let Err(e) = check_tripwire(session) {
        audit_attempt(session, "bootstrap_plan", args, Err(&e))?;
        return Err(e);
    }
    if !session.context_fetched() {
        let e = GateError::ContextRequired;
        audit_attempt(session, "bootstrap_plan", args, Err(&e))?;
        return Err(e);
    }

    match bootstrap(session.root(), session.store(), description, phases) {
        Ok(plan) => {
            let result = json!({ "plan": plan.id(), "hash": plan.hash.to_hex() });
            audit_attempt(session, "bootstrap_plan", args, Ok(result))?;
            Ok(plan)
        }
        Err(e) => {
            let e = GateError::plan("plan", e);
            audit_attempt(session, "bootstrap_plan", args, Err(&e))?;
            Err(e)
        }
    }
}

/// List stored plans, optionally only those whose scope covers a path
///
/// With `covering` set, each plan is loaded (hash-verified) and kept only
/// when its path allowlist matches the given root-relative path.
///
/// # Errors
/// Fails when the plan store cannot be read or a stored plan fails
/// hash verification.
pub fn list_plans(
    session: &Session,
    covering: Option<&std::path::Path>,
) -> Result<Vec<PlanSummary>, GateError> {
    let summaries = session
        .store()
        .list()
        .map_err(|e| GateError::plan("plan", e))?;
    let Some(target) = covering else {
        return Ok(summaries);
    };

    let mut matching = Vec::new();
    for summary in summaries {
        let plan = session
            .store()
            .load_by_ref(&PlanRef::Hash(summary.hash))
            .map_err(|e| GateError::plan("plan", e))?;
        if plan
            .authorizes_path(target)
            .map_err(|e| GateError::plan("plan", e))?
        {
            matching.push(summary);
        }
    }
    Ok(matching)
}

/// Lint plan text, a plan file, or a stored plan
///
/// # Errors
/// Fails when the source cannot be read; lint findings are the `Ok` value.
pub fn lint_plan(session: &Session, source: &LintSource) -> Result<Vec<PolicyViolation>, GateError> {
    let text = match source {
        LintSource::Text(text) => text.clone(),
        LintSource::File(path) => {
            std::fs::read_to_string(path).map_err(|e| GateError::io("plan", &e))?
        }
        LintSource::Stored(reference) => session
            .store()
            .read_text(reference)
            .map_err(|e| GateError::plan("plan", e))?,
    };
    Ok(lint(&text))
}

/// Read the full audit log
///
/// Available while the tripwire is engaged.
///
/// # Errors
/// Fails when the log is unreadable or any entry is corrupt.
pub fn read_audit_log(session: &Session) -> Result<Vec<AuditEntry>, GateError> {
    session
        .ledger()
        .read()
        .map_err(|e| GateError::audit("audit", &e))
}

/// Verify the audit chain end to end
///
/// Always returns a report; available while the tripwire is engaged.
#[must_use]
pub fn verify_workspace_integrity(session: &Session) -> IntegrityReport {
    session.ledger().verify()
}
