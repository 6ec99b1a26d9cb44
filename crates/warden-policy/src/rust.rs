//! Rust-specific analyzer
//!
//! Tightens the lexical floor for `*.rs` files: panic-style error discarding
//! is banned outside test code, discarded `Result` bindings are flagged, and
//! `unsafe` blocks must carry an explicit `// SAFETY:` justification on the
//! preceding line. Also demands formatter and compiler preflight after any
//! tentative write.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyzer::{FileAnalyzer, PreflightStep};
use crate::lexical::{is_test_path, line_col};
use crate::violation::{PolicyViolation, ViolationCategory};

/// Panic-style escape hatches banned in non-test code
static PANIC_IDIOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.unwrap\(\)|\.expect\(|panic!\s*\(|todo!\s*[(!]?|unimplemented!\s*[(!]?")
        .expect("panic idiom pattern")
});

/// `let _ = some_call(...)` — a discarded result
static DISCARDED_RESULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"let\s+_\s*=\s*[A-Za-z_][\w:.]*\(").expect("discard pattern"));

/// `unsafe` block openers
static UNSAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bunsafe\s*\{").expect("unsafe pattern"));

/// Stricter rules for Rust source files
#[derive(Debug, Clone, Copy, Default)]
pub struct RustAnalyzer;

impl RustAnalyzer {
    /// Create a new analyzer instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Byte offset where inline test code starts, if any
    ///
    /// Matches after `#[cfg(test)]` are exempt from the panic-idiom rules,
    /// matching the exemption for dedicated test files.
    fn test_region_start(content: &str) -> Option<usize> {
        content.find("#[cfg(test)]")
    }

    /// Whether the line preceding `offset` carries a `// SAFETY:` note
    fn has_safety_note(content: &str, offset: usize) -> bool {
        let line_start = content[..offset].rfind('\n').map_or(0, |nl| nl + 1);
        if line_start == 0 {
            return false;
        }
        let prev_start = content[..line_start - 1].rfind('\n').map_or(0, |nl| nl + 1);
        content[prev_start..line_start].trim_start().starts_with("// SAFETY:")
    }
}

impl FileAnalyzer for RustAnalyzer {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn handles(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "rs")
    }

    fn scan(&self, path: &Path, content: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let test_start = if is_test_path(path) {
            Some(0)
        } else {
            Self::test_region_start(content)
        };
        let in_test_region = |offset: usize| test_start.is_some_and(|start| offset >= start);

        for m in PANIC_IDIOM_RE.find_iter(content) {
            if in_test_region(m.start()) {
                continue;
            }
            let (line, column) = line_col(content, m.start());
            violations.push(PolicyViolation::new(
                ViolationCategory::ForbiddenIdiom,
                format!("panic-style error discard `{}`", m.as_str().trim_end_matches('(')),
                line,
                column,
            ));
        }

        for m in DISCARDED_RESULT_RE.find_iter(content) {
            if in_test_region(m.start()) {
                continue;
            }
            let (line, column) = line_col(content, m.start());
            violations.push(PolicyViolation::new(
                ViolationCategory::SwallowedError,
                "`let _ =` discards a call result without handling it",
                line,
                column,
            ));
        }

        for m in UNSAFE_RE.find_iter(content) {
            if !Self::has_safety_note(content, m.start()) {
                let (line, column) = line_col(content, m.start());
                violations.push(PolicyViolation::new(
                    ViolationCategory::ForbiddenIdiom,
                    "`unsafe` block without a preceding `// SAFETY:` note",
                    line,
                    column,
                ));
            }
        }

        violations
    }

    fn preflight(&self) -> Vec<PreflightStep> {
        vec![
            PreflightStep::new("rustfmt", &["cargo", "fmt", "--check"]),
            PreflightStep::new("cargo-check", &["cargo", "check", "--quiet"]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Vec<PolicyViolation> {
        RustAnalyzer::new().scan(Path::new("src/module.rs"), content)
    }

    #[test]
    fn handles_only_rust_files() {
        let analyzer = RustAnalyzer::new();
        assert!(analyzer.handles(Path::new("src/lib.rs")));
        assert!(!analyzer.handles(Path::new("src/lib.py")));
    }

    #[test]
    fn unwrap_is_banned() {
        let violations = scan("fn f(v: Option<u32>) -> u32 {\n    v.unwrap()\n}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category, ViolationCategory::ForbiddenIdiom);
        assert_eq!(violations[0].line, 2);
    }

    #[test]
    fn expect_and_panic_are_banned() {
        let violations = scan("fn f() {\n    g().expect(\"boom\");\n    panic!(\"no\");\n}\n");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn discarded_result_is_swallowed_error() {
        let violations = scan("fn f() {\n    let _ = std::fs::remove_file(\"x\");\n}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category, ViolationCategory::SwallowedError);
    }

    #[test]
    fn unwrap_allowed_after_cfg_test() {
        let content = "fn f() -> u32 { 1 }\n\n#[cfg(test)]\nmod tests {\n    #[test]\n    fn check() { assert_eq!(super::f(), 1); Some(1).unwrap(); }\n}\n";
        assert!(scan(content).is_empty());
    }

    #[test]
    fn unwrap_allowed_in_test_files() {
        let analyzer = RustAnalyzer::new();
        let violations =
            analyzer.scan(Path::new("tests/api_tests.rs"), "fn f() { g().unwrap(); }\n");
        assert!(violations.is_empty());
    }

    #[test]
    fn unsafe_without_safety_note_is_flagged() {
        let violations = scan("fn f() {\n    unsafe { core::hint::unreachable_unchecked() }\n}\n");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn unsafe_with_safety_note_passes() {
        let content =
            "fn f(p: *const u8) -> u8 {\n    // SAFETY: caller guarantees p is valid\n    unsafe { *p }\n}\n";
        assert!(scan(content).is_empty());
    }

    #[test]
    fn preflight_demands_fmt_and_check() {
        let steps = RustAnalyzer::new().preflight();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "rustfmt");
        assert_eq!(steps[1].argv[0], "cargo");
    }
}
