//! Warden policy engine
//!
//! Statically scans proposed file content for evidence of incomplete work:
//! stub markers, placeholder identifiers, empty bodies, swallowed errors, and
//! language-specific forbidden idioms. Every finding is a hard block — there
//! is no "warn but allow" mode anywhere in this crate.
//!
//! # Architecture
//!
//! ```text
//! content → LexicalAnalyzer (always) → per-file-type extensions → [PolicyViolation]
//! ```
//!
//! Analyzers implement [`FileAnalyzer`] and are dispatched by path through an
//! [`AnalyzerSet`]. An analyzer may also declare post-write
//! [`PreflightStep`]s (formatter, compiler) that the write orchestrator runs
//! after a tentative mutation; a failing step forces revert.

pub mod analyzer;
pub mod lexical;
pub mod rust;
pub mod violation;

pub use analyzer::{AnalyzerSet, FileAnalyzer, PreflightStep};
pub use lexical::{is_test_path, LexicalAnalyzer};
pub use rust::RustAnalyzer;
pub use violation::{PolicyViolation, ViolationCategory};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
