//! Warden workspace layer
//!
//! The trusted boundary between the gatekeeper and the filesystem it governs.
//! Provides two primitives the rest of the workspace builds on:
//!
//! - [`WorkspaceRoot`]: a single, canonical, session-locked root directory.
//!   Every governed path is resolved against it and must stay inside it.
//! - [`ContentHash`]: a strongly-typed 32-byte blake3 hash used for plan
//!   identity, audit chaining, and optimistic concurrency tokens.
//!
//! # Layout under the root
//!
//! ```text
//! <root>/.warden/plans/         one file per plan, named by content hash
//! <root>/.warden/audit/log.jsonl  append-only hash-chained audit log
//! <root>/.warden/governance.json  bootstrap flag + approved plan count
//! ```
//!
//! All three locations are derived accessors on [`WorkspaceRoot`] and are
//! created on first use.

pub mod hash;
pub mod root;

pub use hash::{ContentHash, HashError};
pub use root::{
    SessionRoots, WorkspaceError, WorkspaceRoot, ROOT_MARKER_DIR, ROOT_MARKER_FILE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
