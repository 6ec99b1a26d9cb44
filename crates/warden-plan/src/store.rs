//! Content-addressed plan storage
//!
//! One file per plan under the workspace plans directory, named by the body
//! hash (`<hex>.toml`). Plans are linted before persistence and hash-verified
//! on every load, so an on-disk edit after approval is detected the next time
//! the plan is referenced.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use warden_workspace::{ContentHash, WorkspaceRoot};

use crate::document::{lint, Plan, PlanDocument, PlanStatus};
use crate::error::PlanError;

/// How a caller refers to a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRef {
    /// By its metadata id
    Id(String),
    /// By its body content hash
    Hash(ContentHash),
}

impl PlanRef {
    /// Interpret a string reference: 64 hex chars is a hash, anything else an id
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        if reference.len() == 64 {
            if let Ok(hash) = reference.parse::<ContentHash>() {
                return Self::Hash(hash);
            }
        }
        Self::Id(reference.to_string())
    }
}

impl Display for PlanRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Hash(hash) => write!(f, "{hash}"),
        }
    }
}

/// Summary row returned by [`PlanStore::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    /// Plan identifier
    pub id: String,
    /// Approval status
    pub status: PlanStatus,
    /// Body content hash
    pub hash: ContentHash,
}

/// The on-disk plan store
#[derive(Debug, Clone)]
pub struct PlanStore {
    root: WorkspaceRoot,
}

impl PlanStore {
    /// Create a store rooted at the locked workspace
    #[inline]
    #[must_use]
    pub fn new(root: WorkspaceRoot) -> Self {
        Self { root }
    }

    /// The workspace root this store serves
    #[inline]
    #[must_use]
    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    fn path_for(&self, hash: ContentHash) -> PathBuf {
        self.root.plans_dir().join(format!("{hash}.toml"))
    }

    /// Lint and persist a plan, keyed by its body hash
    ///
    /// The approval header's `hash` field is filled with the computed value
    /// before writing, so loads can cross-check the on-disk bytes.
    ///
    /// # Errors
    /// Returns [`PlanError::LintFailed`] for a policy-violating plan, or an
    /// IO/encoding error.
    pub fn save(&self, mut document: PlanDocument) -> Result<Plan, PlanError> {
        let text = document.to_toml()?;
        let violations = lint(&text);
        if let Some(first) = violations.first() {
            return Err(PlanError::LintFailed {
                id: document.metadata.id.clone(),
                count: violations.len(),
                first: first.to_string(),
            });
        }

        let hash = document.body_hash()?;
        document.approval.hash = Some(hash);

        let plans_dir = self.root.plans_dir();
        std::fs::create_dir_all(&plans_dir).map_err(|e| PlanError::io(&plans_dir, e))?;
        let path = self.path_for(hash);
        std::fs::write(&path, document.to_toml()?).map_err(|e| PlanError::io(&path, e))?;

        tracing::info!(plan = %document.metadata.id, hash = %hash.short(), "plan persisted");
        Ok(Plan { document, hash })
    }

    /// Read the raw text of a stored plan
    ///
    /// # Errors
    /// Returns [`PlanError::NotFound`] if no plan matches the reference.
    pub fn read_text(&self, reference: &PlanRef) -> Result<String, PlanError> {
        let path = self.locate(reference)?;
        std::fs::read_to_string(&path).map_err(|e| PlanError::io(&path, e))
    }

    /// Load a plan and verify its on-disk bytes against the recorded hash
    ///
    /// # Errors
    /// Distinct variants per failure: [`PlanError::NotFound`],
    /// [`PlanError::TamperedContent`], [`PlanError::Malformed`].
    pub fn load_by_ref(&self, reference: &PlanRef) -> Result<Plan, PlanError> {
        let path = self.locate(reference)?;
        let text = std::fs::read_to_string(&path).map_err(|e| PlanError::io(&path, e))?;
        let document = PlanDocument::parse(&text)?;

        let recomputed = document.body_hash()?;
        let recorded = document.approval.hash.ok_or_else(|| PlanError::Malformed {
            message: format!("plan `{}` has no recorded hash", document.metadata.id),
        })?;
        if recorded != recomputed {
            return Err(PlanError::TamperedContent {
                id: document.metadata.id.clone(),
                recorded,
                recomputed,
            });
        }
        if let PlanRef::Hash(expected) = reference {
            if *expected != recomputed {
                return Err(PlanError::TamperedContent {
                    id: document.metadata.id.clone(),
                    recorded: *expected,
                    recomputed,
                });
            }
        }

        Ok(Plan {
            document,
            hash: recomputed,
        })
    }

    /// Summaries of every stored plan, in file order
    ///
    /// # Errors
    /// Returns an IO error reading the plans directory, or
    /// [`PlanError::Malformed`] for an unparsable stored plan.
    pub fn list(&self) -> Result<Vec<PlanSummary>, PlanError> {
        let plans_dir = self.root.plans_dir();
        if !plans_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let entries =
            std::fs::read_dir(&plans_dir).map_err(|e| PlanError::io(&plans_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PlanError::io(&plans_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| PlanError::io(&path, e))?;
            let document = PlanDocument::parse(&text)?;
            summaries.push(PlanSummary {
                id: document.metadata.id.clone(),
                status: document.approval.status,
                hash: document.body_hash()?,
            });
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Find the file backing a reference
    fn locate(&self, reference: &PlanRef) -> Result<PathBuf, PlanError> {
        match reference {
            PlanRef::Hash(hash) => {
                let path = self.path_for(*hash);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(PlanError::NotFound {
                        reference: reference.to_string(),
                    })
                }
            }
            PlanRef::Id(id) => {
                let summaries = self.list()?;
                for summary in &summaries {
                    if summary.id == *id {
                        return Ok(self.path_for(summary.hash));
                    }
                }
                // No id matched; a hex string of 8+ chars may be a hash prefix.
                if id.len() >= 8 && id.chars().all(|c| c.is_ascii_hexdigit()) {
                    let prefix = id.to_ascii_lowercase();
                    let mut matches = summaries
                        .iter()
                        .filter(|s| s.hash.to_hex().starts_with(&prefix));
                    if let Some(first) = matches.next() {
                        if matches.next().is_some() {
                            return Err(PlanError::Malformed {
                                message: format!("ambiguous plan hash prefix `{id}`"),
                            });
                        }
                        return Ok(self.path_for(first.hash));
                    }
                }
                Err(PlanError::NotFound {
                    reference: reference.to_string(),
                })
            }
        }
    }
}
