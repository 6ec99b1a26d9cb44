//! Warden plan engine
//!
//! A *plan* is the approval unit of the gatekeeper: a hash-identified TOML
//! document that scopes which files may be changed, through which phases, and
//! under which verification gates. Nothing is written without an approved
//! plan covering the target path.
//!
//! # Lifecycle
//!
//! ```text
//! draft → lint → persist (named by content hash) → approve → enforce per write
//! ```
//!
//! The content hash is computed over the canonical plan body with the mutable
//! `[approval]` header stripped, so approving a plan (which edits the header)
//! never invalidates its own hash, while any edit to the body does.
//!
//! Bootstrap is the one-time escape hatch: before any plan exists, the first
//! plan may be created and approved without prior authorization; the window
//! closes permanently afterwards.

pub mod document;
pub mod enforce;
pub mod error;
pub mod governance;
pub mod store;

pub use document::{
    compute_hash, lint, Approval, Phase, Plan, PlanDocument, PlanMetadata, PlanScope, PlanStatus,
    Rollback, Verification,
};
pub use enforce::enforce;
pub use error::PlanError;
pub use governance::{approve_plan, bootstrap, GovernanceState};
pub use store::{PlanRef, PlanStore, PlanSummary};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
