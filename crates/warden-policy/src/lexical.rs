//! Default lexical analyzer
//!
//! Pattern-based scanning that applies to every file type. Detects
//! incomplete-work markers, stub/mock identifiers, empty bodies, swallowed
//! error handlers, and placeholder return values. Language-aware refinements
//! live in per-file-type analyzers (see [`crate::rust`]); this one is the
//! floor every write must clear.

use std::collections::HashSet;
use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyzer::FileAnalyzer;
use crate::violation::{PolicyViolation, ViolationCategory};

/// Incomplete-work markers, in code or comments
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:todo|fixme|xxx|hack|wip)\b|(?i)not implemented|coming soon|placeholder")
        .expect("marker pattern")
});

/// Empty function bodies in brace languages
static EMPTY_BRACE_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:fn|function)\s+\w+[^{};]*\{\s*\}").expect("empty brace body pattern")
});

/// Empty Python-style function bodies (`pass` or `...` only)
static EMPTY_PY_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*def\s+\w+\([^)]*\)[^:\n]*:[ \t]*(?:\r?\n[ \t]*)?(?:pass|\.\.\.)[ \t]*$")
        .expect("empty python body pattern")
});

/// `catch {}`-shaped handlers that discard the error
static EMPTY_CATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcatch\s*(?:\([^)]*\))?\s*\{\s*\}").expect("empty catch pattern")
});

/// Bare `except: pass` handlers
static EXCEPT_PASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*except\b[^\n:]*:[ \t]*(?:\r?\n[ \t]*)?pass\b").expect("except pattern")
});

/// Literal placeholder return values
static PLACEHOLDER_RETURN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\breturn\s+["'](?:todo|placeholder|not implemented)["']"#)
        .expect("placeholder return pattern")
});

/// Compound stub/mock/fake identifiers
static STUB_IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:mock|fake|stub|dummy)(?:_[A-Za-z0-9_]+|[A-Z][A-Za-z0-9_]*)\b")
        .expect("stub identifier pattern")
});

/// 1-based line/column of a byte offset
#[must_use]
pub(crate) fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset];
    let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = before.rfind('\n').map_or(offset + 1, |nl| offset - nl);
    (line, column)
}

/// Whether a path is test code
///
/// Test files are exempt from the stub-identifier rules (mock objects are the
/// point of a test double) but not from incomplete-work markers.
#[must_use]
pub fn is_test_path(path: &Path) -> bool {
    let in_tests_dir = path
        .components()
        .any(|c| matches!(c, Component::Normal(seg) if seg == "tests"));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    in_tests_dir
        || name.starts_with("test_")
        || name.ends_with("_test.rs")
        || name.ends_with("_test.py")
        || name.contains(".test.")
        || name.contains(".spec.")
}

/// The default, language-agnostic analyzer
///
/// Applies to every path; always first in the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalAnalyzer;

impl LexicalAnalyzer {
    /// Create a new analyzer instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn push_matches(
        regex: &Regex,
        content: &str,
        category: ViolationCategory,
        describe: &str,
        out: &mut Vec<PolicyViolation>,
    ) {
        for m in regex.find_iter(content) {
            let (line, column) = line_col(content, m.start());
            out.push(PolicyViolation::new(
                category,
                format!("{describe}: `{}`", m.as_str().trim()),
                line,
                column,
            ));
        }
    }

    /// Flag stub identifiers and references to already-flagged ones
    ///
    /// The first occurrence of each distinct stub-shaped name is a
    /// `FORBIDDEN_IDIOM`; every later occurrence of that same name is a
    /// `STUB_REFERENCE`.
    fn scan_stub_idents(content: &str, out: &mut Vec<PolicyViolation>) {
        let mut flagged: HashSet<&str> = HashSet::new();
        for m in STUB_IDENT_RE.find_iter(content) {
            let (line, column) = line_col(content, m.start());
            if flagged.insert(m.as_str()) {
                out.push(PolicyViolation::new(
                    ViolationCategory::ForbiddenIdiom,
                    format!("stub/mock identifier `{}`", m.as_str()),
                    line,
                    column,
                ));
            } else {
                out.push(PolicyViolation::new(
                    ViolationCategory::StubReference,
                    format!("reference to flagged stub symbol `{}`", m.as_str()),
                    line,
                    column,
                ));
            }
        }
    }
}

impl FileAnalyzer for LexicalAnalyzer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn handles(&self, _path: &Path) -> bool {
        true
    }

    fn scan(&self, path: &Path, content: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();

        Self::push_matches(
            &MARKER_RE,
            content,
            ViolationCategory::IncompleteMarker,
            "incomplete-work marker",
            &mut violations,
        );
        Self::push_matches(
            &EMPTY_BRACE_BODY_RE,
            content,
            ViolationCategory::EmptyBody,
            "empty function body",
            &mut violations,
        );
        Self::push_matches(
            &EMPTY_PY_BODY_RE,
            content,
            ViolationCategory::EmptyBody,
            "empty function body",
            &mut violations,
        );
        Self::push_matches(
            &EMPTY_CATCH_RE,
            content,
            ViolationCategory::SwallowedError,
            "empty catch handler",
            &mut violations,
        );
        Self::push_matches(
            &EXCEPT_PASS_RE,
            content,
            ViolationCategory::SwallowedError,
            "pass-through except handler",
            &mut violations,
        );

        if !is_test_path(path) {
            Self::push_matches(
                &PLACEHOLDER_RETURN_RE,
                content,
                ViolationCategory::ForbiddenIdiom,
                "placeholder return value",
                &mut violations,
            );
            Self::scan_stub_idents(content, &mut violations);
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scan(content: &str) -> Vec<PolicyViolation> {
        LexicalAnalyzer::new().scan(Path::new("src/service.rs"), content)
    }

    fn categories(violations: &[PolicyViolation]) -> Vec<ViolationCategory> {
        violations.iter().map(|v| v.category).collect()
    }

    #[test]
    fn clean_content_passes() {
        let content = "fn add(a: u32, b: u32) -> u32 {\n    a + b\n}\n";
        assert!(scan(content).is_empty());
    }

    #[test]
    fn marker_in_comment_is_flagged() {
        let content = "fn run() -> u32 {\n    // TODO: finish this\n    1\n}\n";
        let violations = scan(content);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].category, ViolationCategory::IncompleteMarker);
        assert_eq!(violations[0].line, 2);
    }

    #[test]
    fn marker_is_case_insensitive() {
        let content = "// fixme later\n";
        let violations = scan(content);
        assert_eq!(categories(&violations), vec![ViolationCategory::IncompleteMarker]);
    }

    #[test]
    fn empty_brace_body_is_flagged() {
        let content = "fn handler(req: Request) -> Response {}\n";
        let violations = scan(content);
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::EmptyBody));
    }

    #[test]
    fn empty_python_body_is_flagged() {
        let content = "def fetch(url):\n    pass\n";
        let violations =
            LexicalAnalyzer::new().scan(Path::new("scripts/fetch.py"), content);
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::EmptyBody));
    }

    #[test]
    fn empty_catch_is_swallowed_error() {
        let content = "try { run(); } catch (e) {}\n";
        let violations = scan(content);
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::SwallowedError));
    }

    #[test]
    fn except_pass_is_swallowed_error() {
        let content = "try:\n    run()\nexcept ValueError:\n    pass\n";
        let violations =
            LexicalAnalyzer::new().scan(Path::new("scripts/run.py"), content);
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::SwallowedError));
    }

    #[test]
    fn placeholder_return_is_forbidden() {
        let content = "function name() { return \"placeholder\"; }\n";
        let violations = scan(content);
        assert!(violations
            .iter()
            .any(|v| v.category == ViolationCategory::ForbiddenIdiom));
    }

    #[test]
    fn stub_identifier_then_reference() {
        let content = "fn mock_fetch() -> u32 { 1 }\n\nfn caller() -> u32 { mock_fetch() }\n";
        let violations = scan(content);
        assert_eq!(
            categories(&violations),
            vec![
                ViolationCategory::ForbiddenIdiom,
                ViolationCategory::StubReference,
            ]
        );
    }

    #[test]
    fn stub_identifiers_allowed_in_tests() {
        let content = "fn mock_fetch() -> u32 { 1 }\n";
        let path = PathBuf::from("tests/fetch_tests.rs");
        let violations = LexicalAnalyzer::new().scan(&path, content);
        assert!(violations.is_empty());
    }

    #[test]
    fn markers_still_banned_in_tests() {
        let content = "// TODO: assert more\nfn check() -> bool { true }\n";
        let path = PathBuf::from("tests/check_tests.rs");
        let violations = LexicalAnalyzer::new().scan(&path, content);
        assert_eq!(categories(&violations), vec![ViolationCategory::IncompleteMarker]);
    }

    #[test]
    fn is_test_path_variants() {
        assert!(is_test_path(Path::new("tests/integration.rs")));
        assert!(is_test_path(Path::new("src/api_test.rs")));
        assert!(is_test_path(Path::new("web/app.test.ts")));
        assert!(!is_test_path(Path::new("src/api.rs")));
    }

    #[test]
    fn line_col_is_one_based() {
        let content = "abc\ndef\n";
        assert_eq!(line_col(content, 0), (1, 1));
        assert_eq!(line_col(content, 5), (2, 2));
    }
}
