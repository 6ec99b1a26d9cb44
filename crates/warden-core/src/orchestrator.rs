//! The gated write pipeline
//!
//! A write request passes through a fixed, strictly-ordered sequence of
//! named gates. Every gate either passes the request through (possibly
//! rewriting the content, as header synthesis does) or refuses with an
//! error attributed to that gate. There is no way to skip a gate and no
//! soft-fail mode.
//!
//! ```text
//! context → validate → plan → policy → extensions → rescan → mutate
//! ```
//!
//! The final `audit` gate lives in the operations surface so that refusals
//! from any earlier gate are recorded too.

use std::path::{Path, PathBuf};
use std::process::Command;

use warden_plan::{enforce, PlanRef};
use warden_policy::{LexicalAnalyzer, FileAnalyzer, PreflightStep};
use warden_workspace::{ContentHash, WorkspaceError};

use crate::error::GateError;
use crate::header::{self, WriteMetadata};
use crate::session::Session;

/// A request to write one file under plan authority
#[derive(Debug, Clone)]
pub struct WriteRequest {
    /// Root-relative target path
    pub path: PathBuf,
    /// Proposed full content of the file
    pub content: String,
    /// The plan claimed to authorize this write
    pub plan: PlanRef,
    /// Expected plan id; checked strictly when present
    pub expected_plan_id: Option<String>,
    /// Expected plan body hash; checked strictly when present
    pub expected_plan_hash: Option<ContentHash>,
    /// Optimistic concurrency token: hash of the bytes the caller last saw
    pub previous_hash: Option<ContentHash>,
    /// Metadata used to synthesize a module header when the file lacks one
    pub metadata: Option<WriteMetadata>,
}

impl WriteRequest {
    /// Minimal request: path, content, and plan reference
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, plan: PlanRef) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            plan,
            expected_plan_id: None,
            expected_plan_hash: None,
            previous_hash: None,
            metadata: None,
        }
    }

    /// Pin the expected plan identity
    #[must_use]
    pub fn expecting(mut self, id: &str, hash: ContentHash) -> Self {
        self.expected_plan_id = Some(id.to_string());
        self.expected_plan_hash = Some(hash);
        self
    }

    /// Supply the optimistic concurrency token
    #[must_use]
    pub fn with_previous_hash(mut self, hash: ContentHash) -> Self {
        self.previous_hash = Some(hash);
        self
    }

    /// Supply header metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: WriteMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Result of a write that passed every gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Root-relative path written
    pub path: PathBuf,
    /// Hash of the bytes now on disk
    pub new_hash: ContentHash,
    /// Id of the authorizing plan
    pub plan_id: String,
    /// Sequence number of the audit entry for this write
    pub audit_seq: u64,
}

/// Committed mutation, before the audit entry exists
#[derive(Debug)]
pub(crate) struct Mutation {
    pub(crate) relative: PathBuf,
    pub(crate) new_hash: ContentHash,
    pub(crate) plan_id: String,
}

/// Run gates 0 through 6 for one request
pub(crate) fn run_gates(session: &Session, request: &WriteRequest) -> Result<Mutation, GateError> {
    // Gate 0: context
    if !session.context_fetched() {
        return Err(GateError::ContextRequired);
    }

    // Gate 1: validate
    let (relative, absolute) = validate(session, request)?;

    // Gate 2: plan
    let plan = enforce(
        session.store(),
        &request.plan,
        &relative,
        request.expected_plan_id.as_deref(),
        request.expected_plan_hash,
    )
    .map_err(|e| GateError::plan("plan", e))?;

    // Gate 3: policy (lexical floor + header synthesis)
    let final_content = policy(&relative, request)?;

    // Gate 4: extensions
    let violations = session.analyzers().scan_all(&relative, &request.content);
    if !violations.is_empty() {
        return Err(GateError::Policy {
            gate: "extensions",
            violations,
        });
    }

    // Gate 5: authoritative re-scan of the final content
    let violations = session.analyzers().scan_all(&relative, &final_content);
    if !violations.is_empty() {
        return Err(GateError::Policy {
            gate: "rescan",
            violations,
        });
    }

    // Gate 6: mutate
    let new_hash = mutate(session, request, &relative, &absolute, &final_content)?;

    tracing::info!(
        path = %relative.display(),
        plan = %plan.id(),
        hash = %new_hash.short(),
        "write committed"
    );
    Ok(Mutation {
        relative,
        new_hash,
        plan_id: plan.id().to_string(),
    })
}

/// Gate 1: request shape and path containment
fn validate(session: &Session, request: &WriteRequest) -> Result<(PathBuf, PathBuf), GateError> {
    if request.path.as_os_str().is_empty() {
        return Err(GateError::Validation {
            gate: "validate",
            message: "target path is empty".to_string(),
        });
    }
    if request.content.is_empty() {
        return Err(GateError::Validation {
            gate: "validate",
            message: "proposed content is empty".to_string(),
        });
    }

    let root = session.root();
    let absolute = root.resolve(&request.path).map_err(|e| match e {
        WorkspaceError::PathEscapesRoot { .. } => GateError::Validation {
            gate: "validate",
            message: e.to_string(),
        },
        other => GateError::Infrastructure {
            gate: "validate",
            code: "INFRA_IO",
            message: other.to_string(),
        },
    })?;

    if absolute.starts_with(root.warden_dir()) {
        return Err(GateError::Validation {
            gate: "validate",
            message: format!(
                "{} is inside the governed state directory",
                request.path.display()
            ),
        });
    }

    let relative = absolute
        .strip_prefix(root.path())
        .map_err(|_| GateError::Validation {
            gate: "validate",
            message: format!("{} does not resolve under the root", request.path.display()),
        })?
        .to_path_buf();
    Ok((relative, absolute))
}

/// Gate 3: lexical floor plus header synthesis
fn policy(relative: &Path, request: &WriteRequest) -> Result<String, GateError> {
    let violations = LexicalAnalyzer::new().scan(relative, &request.content);
    if !violations.is_empty() {
        return Err(GateError::Policy {
            gate: "policy",
            violations,
        });
    }
    header::apply(relative, request.content.clone(), request.metadata.as_ref()).map_err(|v| {
        GateError::Policy {
            gate: "policy",
            violations: vec![v],
        }
    })
}

/// Gate 6: optimistic concurrency, tentative write, preflight, revert
fn mutate(
    session: &Session,
    request: &WriteRequest,
    relative: &Path,
    absolute: &Path,
    final_content: &str,
) -> Result<ContentHash, GateError> {
    let prior: Option<Vec<u8>> = if absolute.is_file() {
        Some(std::fs::read(absolute).map_err(|e| GateError::io("mutate", &e))?)
    } else {
        None
    };

    if let Some(expected) = request.previous_hash {
        match &prior {
            Some(bytes) => {
                let current = ContentHash::compute(bytes);
                if current != expected {
                    return Err(GateError::Integrity {
                        gate: "mutate",
                        message: format!(
                            "{} changed underneath the caller: expected {}, found {}",
                            relative.display(),
                            expected.short(),
                            current.short()
                        ),
                    });
                }
            }
            None => {
                return Err(GateError::Integrity {
                    gate: "mutate",
                    message: format!(
                        "{} no longer exists but the caller observed {}",
                        relative.display(),
                        expected.short()
                    ),
                });
            }
        }
    }

    if let Some(parent) = absolute.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GateError::io("mutate", &e))?;
    }
    std::fs::write(absolute, final_content).map_err(|e| GateError::io("mutate", &e))?;

    if session.config().preflight {
        let mut steps = session.analyzers().preflight_for(relative);
        if !session.config().verify_command.is_empty() {
            steps.push(PreflightStep {
                name: "workspace-verify",
                argv: session.config().verify_command.clone(),
            });
        }
        for step in steps {
            if let Err(message) = run_step(session, &step) {
                revert(absolute, prior.as_deref())?;
                tracing::warn!(
                    path = %relative.display(),
                    step = step.name,
                    "preflight failed; mutation reverted"
                );
                return Err(GateError::Preflight {
                    gate: "mutate",
                    step: step.name.to_string(),
                    message,
                });
            }
        }
    }

    Ok(ContentHash::compute(final_content.as_bytes()))
}

fn run_step(session: &Session, step: &PreflightStep) -> Result<(), String> {
    let Some((program, args)) = step.argv.split_first() else {
        return Ok(());
    };
    let output = Command::new(program)
        .args(args)
        .current_dir(session.root().path())
        .output()
        .map_err(|e| format!("failed to spawn {program}: {e}"))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        ))
    }
}

/// Restore the pre-write bytes, or remove a file that did not exist before
fn revert(absolute: &Path, prior: Option<&[u8]>) -> Result<(), GateError> {
    match prior {
        Some(bytes) => std::fs::write(absolute, bytes).map_err(|e| GateError::io("mutate", &e)),
        None => std::fs::remove_file(absolute).map_err(|e| GateError::io("mutate", &e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use warden_workspace::WorkspaceRoot;

    fn armed_session() -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::discover(dir.path()).unwrap();
        root.ensure_layout().unwrap();
        let config = GateConfig {
            preflight: false,
            ..GateConfig::default()
        };
        let session = Session::with_config(root, config);
        session.fetch_context().unwrap();
        (dir, session)
    }

    #[test]
    fn unarmed_session_is_refused_at_gate_zero() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::open(dir.path()).unwrap();
        let request = WriteRequest::new(
            "notes/a.md",
            "# a\n",
            PlanRef::Id("any".to_string()),
        );
        let err = run_gates(&session, &request).unwrap_err();
        assert!(matches!(err, GateError::ContextRequired));
    }

    #[test]
    fn empty_path_is_refused_at_validate() {
        let (_dir, session) = armed_session();
        let request = WriteRequest::new("", "content\n", PlanRef::Id("any".to_string()));
        let err = run_gates(&session, &request).unwrap_err();
        assert!(matches!(err, GateError::Validation { gate: "validate", .. }));
    }

    #[test]
    fn escaping_path_is_refused_at_validate() {
        let (_dir, session) = armed_session();
        let request = WriteRequest::new(
            "../outside.md",
            "# escape\n",
            PlanRef::Id("any".to_string()),
        );
        let err = run_gates(&session, &request).unwrap_err();
        assert!(matches!(err, GateError::Validation { gate: "validate", .. }));
    }

    #[test]
    fn governed_state_directory_is_refused() {
        let (_dir, session) = armed_session();
        let request = WriteRequest::new(
            ".warden/governance.json",
            "{}",
            PlanRef::Id("any".to_string()),
        );
        let err = run_gates(&session, &request).unwrap_err();
        assert!(matches!(err, GateError::Validation { gate: "validate", .. }));
    }

    #[test]
    fn missing_plan_is_refused_at_plan_gate() {
        let (_dir, session) = armed_session();
        let request = WriteRequest::new(
            "notes/a.md",
            "# a\n",
            PlanRef::Id("ghost".to_string()),
        );
        let err = run_gates(&session, &request).unwrap_err();
        assert_eq!(err.code(), "PLAN_NOT_FOUND");
    }
}
