//! Analyzer chain
//!
//! Mirrors a parser-registry design: analyzers are keyed by the paths they
//! handle and run in registration order. The default [`LexicalAnalyzer`] is
//! always first; file-type extensions follow and may both tighten the static
//! rules and demand post-write preflight verification.

use std::path::Path;

use crate::lexical::LexicalAnalyzer;
use crate::violation::PolicyViolation;

/// A post-write verification step demanded by an analyzer
///
/// Run by the write orchestrator after a tentative mutation; any failing step
/// forces the mutation to be reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightStep {
    /// Short name used in error attribution
    pub name: &'static str,
    /// Command argv, executed with the workspace root as working directory
    pub argv: Vec<String>,
}

impl PreflightStep {
    /// Create a preflight step
    #[must_use]
    pub fn new(name: &'static str, argv: &[&str]) -> Self {
        Self {
            name,
            argv: argv.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// A static analyzer for one class of files
pub trait FileAnalyzer: Send + Sync {
    /// Short name used in error attribution
    fn name(&self) -> &'static str;

    /// Whether this analyzer applies to `path`
    fn handles(&self, path: &Path) -> bool;

    /// Scan proposed content, returning every violation found
    fn scan(&self, path: &Path, content: &str) -> Vec<PolicyViolation>;

    /// Post-write verification steps this analyzer demands
    fn preflight(&self) -> Vec<PreflightStep> {
        Vec::new()
    }
}

/// Ordered chain of analyzers
pub struct AnalyzerSet {
    analyzers: Vec<Box<dyn FileAnalyzer>>,
}

impl AnalyzerSet {
    /// Empty chain (no analyzers at all; mainly for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// The standard chain: lexical default plus the Rust extension
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.register(LexicalAnalyzer::new());
        set.register(crate::rust::RustAnalyzer::new());
        set
    }

    /// Append an analyzer to the chain
    pub fn register<A: FileAnalyzer + 'static>(&mut self, analyzer: A) {
        self.analyzers.push(Box::new(analyzer));
    }

    /// Number of registered analyzers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Whether the chain is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Run every matching analyzer over `content`, in chain order
    #[must_use]
    pub fn scan_all(&self, path: &Path, content: &str) -> Vec<PolicyViolation> {
        self.analyzers
            .iter()
            .filter(|a| a.handles(path))
            .flat_map(|a| a.scan(path, content))
            .collect()
    }

    /// Preflight steps demanded by every matching analyzer, in chain order
    #[must_use]
    pub fn preflight_for(&self, path: &Path) -> Vec<PreflightStep> {
        self.analyzers
            .iter()
            .filter(|a| a.handles(path))
            .flat_map(|a| a.preflight())
            .collect()
    }
}

impl std::fmt::Debug for AnalyzerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.analyzers.iter().map(|a| a.name()))
            .finish()
    }
}

impl Default for AnalyzerSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ViolationCategory;

    #[test]
    fn standard_chain_has_lexical_first() {
        let set = AnalyzerSet::standard();
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{set:?}"), "[\"lexical\", \"rust\"]");
    }

    #[test]
    fn scan_all_unions_matching_analyzers() {
        let set = AnalyzerSet::standard();
        let content = "fn go() -> u32 {\n    value.unwrap()\n}\n";
        let violations = set.scan_all(Path::new("src/go.rs"), content);
        // Only the rust analyzer objects here; the lexical floor is clean.
        assert!(violations
            .iter()
            .all(|v| v.category == ViolationCategory::ForbiddenIdiom));
        assert!(!violations.is_empty());
    }

    #[test]
    fn non_rust_path_skips_rust_analyzer() {
        let set = AnalyzerSet::standard();
        let content = "value.unwrap()\n";
        let violations = set.scan_all(Path::new("notes/log.txt"), content);
        assert!(violations.is_empty());
    }

    #[test]
    fn preflight_for_rust_paths_only() {
        let set = AnalyzerSet::standard();
        assert!(!set.preflight_for(Path::new("src/lib.rs")).is_empty());
        assert!(set.preflight_for(Path::new("readme.md")).is_empty());
    }
}
