//! Session context
//!
//! All gatekeeper state for one actor lives on an explicit [`Session`]
//! object: the locked workspace root, the plan store, the analyzer chain,
//! the audit ledger, the gate config, the context-fetched flag, and the
//! tripwire. There are no globals; two sessions never share mutable state.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use warden_audit::AuditLedger;
use warden_plan::{GovernanceState, PlanStore, PlanSummary};
use warden_policy::AnalyzerSet;
use warden_workspace::{SessionRoots, WorkspaceRoot};

use crate::config::GateConfig;
use crate::error::GateError;

/// Snapshot returned by [`Session::fetch_context`]
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    /// Canonical workspace root path
    pub root: std::path::PathBuf,
    /// Actor id of this session
    pub actor: String,
    /// Every stored plan
    pub plans: Vec<PlanSummary>,
    /// Whether the one-time bootstrap window is still open
    pub bootstrap_enabled: bool,
}

/// One actor's gatekeeper session
pub struct Session {
    root: WorkspaceRoot,
    roots: SessionRoots,
    actor: String,
    store: PlanStore,
    analyzers: AnalyzerSet,
    ledger: AuditLedger,
    config: GateConfig,
    context_fetched: AtomicBool,
    tripwire: Mutex<Option<String>>,
}

impl Session {
    /// Open a session rooted at (or discovered upward from) `candidate`
    ///
    /// Ensures the governed layout exists and loads the gate config from the
    /// workspace marker file.
    ///
    /// # Errors
    /// Fails when the root cannot be established or the config is malformed.
    pub fn open(candidate: impl AsRef<std::path::Path>) -> Result<Self, GateError> {
        let roots = SessionRoots::new();
        let root = roots.lock(candidate).map_err(|e| GateError::Validation {
            gate: "context",
            message: e.to_string(),
        })?;
        root.ensure_layout().map_err(|e| GateError::Infrastructure {
            gate: "context",
            code: "INFRA_IO",
            message: e.to_string(),
        })?;
        let config = GateConfig::load(&root)?;
        let mut session = Self::with_config(root, config);
        session.roots = roots;
        Ok(session)
    }

    /// Build a session over an already-locked root with an explicit config
    #[must_use]
    pub fn with_config(root: WorkspaceRoot, config: GateConfig) -> Self {
        let actor = uuid::Uuid::new_v4().to_string();
        let ledger = AuditLedger::new(root.clone()).with_policy(config.lock_policy());
        tracing::info!(root = %root.path().display(), actor = %actor, "session opened");
        Self {
            roots: SessionRoots::with_root(root.clone()),
            store: PlanStore::new(root.clone()),
            analyzers: AnalyzerSet::standard(),
            ledger,
            config,
            context_fetched: AtomicBool::new(false),
            tripwire: Mutex::new(None),
            root,
            actor,
        }
    }

    /// Fetch the workspace context, arming the session for mutation
    ///
    /// Gate 0 refuses every mutating operation until this has run once.
    ///
    /// # Errors
    /// Fails when the plan store or governance record cannot be read.
    pub fn fetch_context(&self) -> Result<ContextSnapshot, GateError> {
        let plans = self
            .store
            .list()
            .map_err(|e| GateError::plan("context", e))?;
        let governance =
            GovernanceState::load(&self.root).map_err(|e| GateError::plan("context", e))?;
        self.context_fetched.store(true, Ordering::SeqCst);
        tracing::debug!(plans = plans.len(), "context fetched");
        Ok(ContextSnapshot {
            root: self.root.path().to_path_buf(),
            actor: self.actor.clone(),
            plans,
            bootstrap_enabled: governance.bootstrap_enabled,
        })
    }

    /// Whether [`Session::fetch_context`] has run this session
    #[inline]
    #[must_use]
    pub fn context_fetched(&self) -> bool {
        self.context_fetched.load(Ordering::SeqCst)
    }

    /// The error code that engaged the tripwire, if it is engaged
    #[inline]
    #[must_use]
    pub fn tripwire(&self) -> Option<String> {
        self.tripwire.lock().clone()
    }

    /// Engage the tripwire with the code of the failure that caused it
    ///
    /// The first engagement wins; later failures do not overwrite the code.
    pub fn trip(&self, code: &str) {
        let mut guard = self.tripwire.lock();
        if guard.is_none() {
            tracing::warn!(code, "tripwire engaged");
            *guard = Some(code.to_string());
        }
    }

    /// Clear the tripwire, re-enabling mutating operations
    pub fn reset_tripwire(&self) {
        if self.tripwire.lock().take().is_some() {
            tracing::info!("tripwire reset");
        }
    }

    /// The locked workspace root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &WorkspaceRoot {
        &self.root
    }

    /// Re-lock the root for a candidate path
    ///
    /// Returns the session root when `candidate` resolves to it; an
    /// incompatible candidate is an error, never a silent re-root.
    ///
    /// # Errors
    /// Fails with a validation error for a conflicting or invalid candidate.
    pub fn confirm_root(
        &self,
        candidate: impl AsRef<std::path::Path>,
    ) -> Result<WorkspaceRoot, GateError> {
        self.roots.lock(candidate).map_err(|e| GateError::Validation {
            gate: "context",
            message: e.to_string(),
        })
    }

    /// This session's actor id
    #[inline]
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// The plan store for this workspace
    #[inline]
    #[must_use]
    pub fn store(&self) -> &PlanStore {
        &self.store
    }

    /// The analyzer chain
    #[inline]
    #[must_use]
    pub fn analyzers(&self) -> &AnalyzerSet {
        &self.analyzers
    }

    /// The audit ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    /// The gate config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.root.path())
            .field("actor", &self.actor)
            .field("context_fetched", &self.context_fetched())
            .field("tripwire", &self.tripwire())
            .finish_non_exhaustive()
    }
}
