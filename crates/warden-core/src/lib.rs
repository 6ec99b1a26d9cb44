//! Warden write orchestrator
//!
//! The top of the gatekeeper stack: sits between an untrusted change
//! producer and a source tree, and refuses any file mutation that is not
//! plan-authorized, policy-clean, and audit-chained. Everything is
//! fail-closed: an error in the gatekeeper's own machinery blocks the write
//! rather than letting it through.
//!
//! # Gate pipeline
//!
//! ```text
//! context → validate → plan → policy → extensions → rescan → mutate → audit
//! ```
//!
//! Each gate is named in every refusal it produces. A policy, integrity,
//! preflight, or infrastructure failure engages the session tripwire;
//! mutating operations then fail until [`Session::reset_tripwire`] runs,
//! while the forensic reads ([`ops::read_audit_log`],
//! [`ops::verify_workspace_integrity`]) stay available.

pub mod config;
pub mod error;
pub mod header;
pub mod ops;
pub mod orchestrator;
pub mod session;

pub use config::GateConfig;
pub use error::GateError;
pub use header::WriteMetadata;
pub use ops::{
    bootstrap_plan, lint_plan, list_plans, read_audit_log, verify_workspace_integrity, write_file,
    LintSource,
};
pub use orchestrator::{WriteReceipt, WriteRequest};
pub use session::{ContextSnapshot, Session};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
