//! Module header synthesis
//!
//! Source files carry a standard module header naming the file's role,
//! purpose, and known failure modes. When a write request supplies that
//! metadata, the header is synthesized and prepended; a source file arriving
//! with neither a header nor metadata is a policy violation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use warden_policy::{PolicyViolation, ViolationCategory};

/// Structured metadata used to synthesize a module header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteMetadata {
    /// Role classification of the module (e.g. `service`, `model`, `util`)
    pub role: String,
    /// One-line statement of what the module is for
    pub purpose: String,
    /// Known failure modes worth flagging to readers
    #[serde(default)]
    pub failure_modes: Vec<String>,
}

/// Extensions of files that must carry a module header
const HEADERED_EXTENSIONS: &[&str] = &["rs", "py", "js", "ts", "go"];

/// Whether files at this path must carry a module header
#[must_use]
pub fn requires_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HEADERED_EXTENSIONS.contains(&ext))
        && !warden_policy::is_test_path(path)
}

fn comment_prefix(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => "#",
        Some("rs") => "//!",
        _ => "//",
    }
}

/// Whether `content` already starts with a comment that can serve as a header
#[must_use]
pub fn has_module_header(path: &Path, content: &str) -> bool {
    let prefix = comment_prefix(path);
    content
        .lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with(prefix) || trimmed.starts_with("/*")
        })
}

/// Render the standard header comment for `metadata`
#[must_use]
pub fn synthesize(path: &Path, metadata: &WriteMetadata) -> String {
    let prefix = comment_prefix(path);
    let mut header = String::new();
    header.push_str(&format!("{prefix} Role: {}\n", metadata.role));
    header.push_str(&format!("{prefix} Purpose: {}\n", metadata.purpose));
    for mode in &metadata.failure_modes {
        header.push_str(&format!("{prefix} Failure mode: {mode}\n"));
    }
    header.push('\n');
    header
}

/// Apply the header policy to proposed content
///
/// Only files that must carry a header are touched; everything else passes
/// through unchanged, metadata or not. Returns the final content to write,
/// or the violation that refuses it.
pub fn apply(
    path: &Path,
    content: String,
    metadata: Option<&WriteMetadata>,
) -> Result<String, PolicyViolation> {
    if !requires_header(path) {
        return Ok(content);
    }
    if let Some(metadata) = metadata {
        if has_module_header(path, &content) {
            return Ok(content);
        }
        let mut with_header = synthesize(path, metadata);
        with_header.push_str(&content);
        return Ok(with_header);
    }
    if !has_module_header(path, &content) {
        return Err(PolicyViolation::structural(
            ViolationCategory::MissingHeader,
            format!(
                "{} has no module header and the request carries no metadata to synthesize one",
                path.display()
            ),
        ));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata() -> WriteMetadata {
        WriteMetadata {
            role: "service".to_string(),
            purpose: "session token rotation".to_string(),
            failure_modes: vec!["clock skew invalidates tokens early".to_string()],
        }
    }

    #[test]
    fn synthesized_rust_header_uses_module_docs() {
        let header = synthesize(Path::new("src/auth.rs"), &metadata());
        assert!(header.starts_with("//! Role: service\n"));
        assert!(header.contains("//! Failure mode: clock skew"));
    }

    #[test]
    fn metadata_prepends_when_content_has_no_header() {
        let out = apply(
            Path::new("src/auth.rs"),
            "pub fn rotate() {}\n".to_string(),
            Some(&metadata()),
        )
        .unwrap();
        assert!(out.starts_with("//! Role: service"));
        assert!(out.ends_with("pub fn rotate() {}\n"));
    }

    #[test]
    fn existing_header_is_left_alone() {
        let content = "//! Session auth.\n\npub fn rotate() {}\n".to_string();
        let out = apply(Path::new("src/auth.rs"), content.clone(), Some(&metadata())).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn headerless_source_without_metadata_is_refused() {
        let err = apply(
            Path::new("src/auth.rs"),
            "pub fn rotate() {}\n".to_string(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.category, ViolationCategory::MissingHeader);
    }

    #[test]
    fn non_source_files_need_no_header() {
        let out = apply(Path::new("notes/design.md"), "# Notes\n".to_string(), None).unwrap();
        assert_eq!(out, "# Notes\n");
    }

    #[test]
    fn test_paths_need_no_header() {
        assert!(!requires_header(Path::new("tests/auth_tests.rs")));
    }

    #[test]
    fn metadata_on_a_non_source_file_changes_nothing() {
        let out = apply(
            Path::new("notes/design.md"),
            "# Notes\n".to_string(),
            Some(&metadata()),
        )
        .unwrap();
        assert_eq!(out, "# Notes\n");
    }

    #[test]
    fn python_headers_use_hash_comments() {
        let out = apply(
            Path::new("scripts/sync.py"),
            "print('x')\n".to_string(),
            Some(&metadata()),
        )
        .unwrap();
        assert!(out.starts_with("# Role: service"));
    }
}
