//! Plan document model
//!
//! Plans are TOML documents with a fixed body shape (metadata, scope, phases,
//! verification, rollback) and one mutable header table, `[approval]`. The
//! content hash covers only the canonical body, so the header can change
//! (approval, rejection) without invalidating the hash, while any body edit
//! does.

use std::path::Path;

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use warden_policy::{FileAnalyzer, LexicalAnalyzer, PolicyViolation, ViolationCategory};
use warden_workspace::ContentHash;

use crate::error::PlanError;

/// Approval status of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Created but not yet approved; authorizes nothing
    Pending,
    /// Approved; authorizes writes within its scope
    Approved,
    /// Explicitly rejected; authorizes nothing, kept for the record
    Rejected,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Approved => f.write_str("APPROVED"),
            Self::Rejected => f.write_str("REJECTED"),
        }
    }
}

/// Mutable approval header — excluded from the content hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    /// Current status
    pub status: PlanStatus,
    /// Content hash of the canonical body, filled at persistence time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
    /// When the plan was approved, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl Default for Approval {
    fn default() -> Self {
        Self {
            status: PlanStatus::Pending,
            hash: None,
            approved_at: None,
        }
    }
}

/// Identifying metadata for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Unique, human-chosen identifier (slug)
    pub id: String,
    /// One-line title
    pub title: String,
    /// What the plan is for
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// What the plan is allowed to touch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanScope {
    /// Narrative objective of the whole plan
    pub objective: String,
    /// Glob patterns (relative to the workspace root) the plan may write
    pub paths: Vec<String>,
}

/// A named sub-unit of a plan with its own operation sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase identifier
    pub id: String,
    /// What this phase accomplishes
    pub objective: String,
    /// Operations this phase permits (e.g. `write`)
    #[serde(default)]
    pub allowed_ops: Vec<String>,
    /// Operations this phase explicitly forbids
    #[serde(default)]
    pub forbidden_ops: Vec<String>,
    /// Intent artifacts that must exist before the phase runs
    #[serde(default)]
    pub intent_artifacts: Vec<String>,
}

/// Verification gates the plan commits to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    /// Human-readable gate descriptions (build, test, review)
    pub gates: Vec<String>,
}

/// Rollback commitment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollback {
    /// What happens when verification fails
    pub policy: String,
}

/// A complete plan document: mutable header plus hashed body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Mutable approval header (never hashed)
    #[serde(default)]
    pub approval: Approval,
    /// Identifying metadata
    pub metadata: PlanMetadata,
    /// Path scope
    pub scope: PlanScope,
    /// Ordered phase list
    pub phases: Vec<Phase>,
    /// Verification gates
    pub verification: Verification,
    /// Rollback commitment
    pub rollback: Rollback,
}

/// Canonical body view used for hashing — field order is the hash contract
#[derive(Serialize)]
struct PlanBodyRef<'a> {
    metadata: &'a PlanMetadata,
    scope: &'a PlanScope,
    phases: &'a [Phase],
    verification: &'a Verification,
    rollback: &'a Rollback,
}

impl PlanDocument {
    /// Parse a plan from TOML text
    ///
    /// # Errors
    /// Returns [`PlanError::Malformed`] when the text is not a valid plan.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        toml::from_str(text).map_err(|e| PlanError::Malformed {
            message: e.to_string(),
        })
    }

    /// Serialize back to TOML text
    ///
    /// # Errors
    /// Returns [`PlanError::Malformed`] if the document cannot be encoded.
    pub fn to_toml(&self) -> Result<String, PlanError> {
        toml::to_string(self).map_err(|e| PlanError::Malformed {
            message: e.to_string(),
        })
    }

    /// Hash of the canonical body, header excluded
    ///
    /// Reproducible: replacing the embedded header hash with the computed
    /// value does not change the result.
    ///
    /// # Errors
    /// Returns [`PlanError::Malformed`] if the body cannot be encoded.
    pub fn body_hash(&self) -> Result<ContentHash, PlanError> {
        let body = PlanBodyRef {
            metadata: &self.metadata,
            scope: &self.scope,
            phases: &self.phases,
            verification: &self.verification,
            rollback: &self.rollback,
        };
        let canonical = toml::to_string(&body).map_err(|e| PlanError::Malformed {
            message: e.to_string(),
        })?;
        Ok(ContentHash::compute(canonical.as_bytes()))
    }
}

/// A loaded, hash-verified plan
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// The parsed document
    pub document: PlanDocument,
    /// Verified content hash of the canonical body
    pub hash: ContentHash,
}

impl Plan {
    /// Plan identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.document.metadata.id
    }

    /// Current approval status
    #[inline]
    #[must_use]
    pub fn status(&self) -> PlanStatus {
        self.document.approval.status
    }

    /// Whether the plan authorizes anything at all
    #[inline]
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status() == PlanStatus::Approved
    }

    /// Build the glob matcher for the path allowlist
    ///
    /// # Errors
    /// Returns [`PlanError::AllowlistInvalid`] for an unbuildable pattern.
    pub fn allowlist(&self) -> Result<GlobSet, PlanError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.document.scope.paths {
            let glob = Glob::new(pattern).map_err(|e| PlanError::AllowlistInvalid {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| PlanError::AllowlistInvalid {
            pattern: self.document.scope.paths.join(", "),
            message: e.to_string(),
        })
    }

    /// Whether the allowlist covers `relative` (a root-relative path)
    ///
    /// # Errors
    /// Returns [`PlanError::AllowlistInvalid`] for an unbuildable pattern.
    pub fn authorizes_path(&self, relative: &Path) -> Result<bool, PlanError> {
        Ok(self.allowlist()?.is_match(relative))
    }

    /// First phase whose operation sets permit `op`
    #[must_use]
    pub fn phase_allowing(&self, op: &str) -> Option<&Phase> {
        self.document.phases.iter().find(|phase| {
            phase.allowed_ops.iter().any(|o| o == op)
                && !phase.forbidden_ops.iter().any(|o| o == op)
        })
    }
}

/// Compute the content hash of plan text
///
/// Parses the text, strips the mutable `[approval]` header, re-serializes the
/// body canonically, and hashes the bytes.
///
/// # Errors
/// Returns [`PlanError::Malformed`] for unparsable text.
pub fn compute_hash(text: &str) -> Result<ContentHash, PlanError> {
    PlanDocument::parse(text)?.body_hash()
}

/// Lint plan text
///
/// Structural requirements (every section present and non-empty, at least one
/// phase and one allowlist pattern) plus a full lexical policy scan of the
/// text itself: a plan that authorizes incomplete work is itself
/// policy-violating.
#[must_use]
pub fn lint(text: &str) -> Vec<PolicyViolation> {
    let document = match PlanDocument::parse(text) {
        Ok(document) => document,
        Err(e) => {
            return vec![PolicyViolation::structural(
                ViolationCategory::MissingHeader,
                format!("plan does not parse: {e}"),
            )]
        }
    };

    let mut violations = Vec::new();
    let mut require = |present: bool, what: &str| {
        if !present {
            violations.push(PolicyViolation::structural(
                ViolationCategory::MissingHeader,
                format!("plan is missing {what}"),
            ));
        }
    };

    require(!document.metadata.id.trim().is_empty(), "a metadata id");
    require(!document.metadata.title.trim().is_empty(), "a metadata title");
    require(
        !document.scope.objective.trim().is_empty(),
        "a scope objective",
    );
    require(
        !document.scope.paths.is_empty(),
        "at least one allowlist pattern",
    );
    require(!document.phases.is_empty(), "at least one phase");
    require(
        !document.verification.gates.is_empty(),
        "at least one verification gate",
    );
    require(
        !document.rollback.policy.trim().is_empty(),
        "a rollback policy",
    );

    for phase in &document.phases {
        if phase.objective.trim().is_empty() {
            violations.push(PolicyViolation::structural(
                ViolationCategory::EmptyBody,
                format!("phase `{}` has no objective", phase.id),
            ));
        }
    }

    violations.extend(LexicalAnalyzer::new().scan(Path::new("plan.toml"), text));
    violations
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A complete, lint-clean plan used across the crate's tests
    pub(crate) fn sample_plan_text() -> String {
        r#"
[approval]
status = "PENDING"

[metadata]
id = "auth-refactor"
title = "Tighten session handling"
description = "Rework session checks in the auth module"
created_at = "2026-08-20T09:00:00Z"

[scope]
objective = "Limit changes to the auth module"
paths = ["src/auth/**", "src/auth.rs"]

[[phases]]
id = "phase-1"
objective = "Rewrite session checks"
allowed_ops = ["write"]
forbidden_ops = ["delete"]
intent_artifacts = ["notes/session.md"]

[verification]
gates = ["cargo test", "manual review"]

[rollback]
policy = "Restore previous file contents on any failed verification"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_plan_text;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_roundtrip() {
        let document = PlanDocument::parse(&sample_plan_text()).unwrap();
        assert_eq!(document.metadata.id, "auth-refactor");
        assert_eq!(document.approval.status, PlanStatus::Pending);
        let text = document.to_toml().unwrap();
        let again = PlanDocument::parse(&text).unwrap();
        assert_eq!(document, again);
    }

    #[test]
    fn hash_ignores_approval_header() {
        let text = sample_plan_text();
        let h1 = compute_hash(&text).unwrap();

        let mut document = PlanDocument::parse(&text).unwrap();
        document.approval.status = PlanStatus::Approved;
        document.approval.hash = Some(h1);
        document.approval.approved_at = Some(chrono::Utc::now());
        let h2 = compute_hash(&document.to_toml().unwrap()).unwrap();

        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_changes_with_body() {
        let text = sample_plan_text();
        let h1 = compute_hash(&text).unwrap();

        let mut document = PlanDocument::parse(&text).unwrap();
        document.scope.paths.push("src/session.rs".to_string());
        let h2 = compute_hash(&document.to_toml().unwrap()).unwrap();

        assert_ne!(h1, h2);
    }

    #[test]
    fn lint_accepts_complete_plan() {
        assert_eq!(lint(&sample_plan_text()), Vec::new());
    }

    #[test]
    fn lint_flags_marker_in_scope() {
        let text = sample_plan_text().replace(
            "Limit changes to the auth module",
            "TODO decide the scope",
        );
        let violations = lint(&text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category, ViolationCategory::IncompleteMarker);
    }

    #[test]
    fn lint_flags_missing_phase() {
        let document = {
            let mut d = PlanDocument::parse(&sample_plan_text()).unwrap();
            d.phases.clear();
            d
        };
        let violations = lint(&document.to_toml().unwrap());
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::MissingHeader
                && v.message.contains("phase")));
    }

    #[test]
    fn lint_reports_unparsable_text() {
        let violations = lint("not toml at all [");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category, ViolationCategory::MissingHeader);
    }

    #[test]
    fn phase_allowing_respects_forbidden_set() {
        let mut document = PlanDocument::parse(&sample_plan_text()).unwrap();
        let hash = document.body_hash().unwrap();
        document.phases[0].forbidden_ops.push("write".to_string());
        let plan = Plan { document, hash };
        assert!(plan.phase_allowing("write").is_none());
    }

    #[test]
    fn allowlist_matches_scoped_paths() {
        let document = PlanDocument::parse(&sample_plan_text()).unwrap();
        let hash = document.body_hash().unwrap();
        let plan = Plan { document, hash };
        assert!(plan.authorizes_path(Path::new("src/auth/session.rs")).unwrap());
        assert!(plan.authorizes_path(Path::new("src/auth.rs")).unwrap());
        assert!(!plan.authorizes_path(Path::new("src/main.rs")).unwrap());
    }
}
