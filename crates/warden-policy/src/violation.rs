//! Policy violation records
//!
//! Every finding produced by a scan. Violations are transient (never
//! persisted directly; the audit ledger stores digests of them) and always
//! hard-blocking.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Category of a policy violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCategory {
    /// Incomplete-work marker (TODO/FIXME/etc.) in code or comments
    IncompleteMarker,
    /// Function, method, or handler with an empty body
    EmptyBody,
    /// Exception/error handler that discards the error
    SwallowedError,
    /// Forbidden idiom for the file's language
    ForbiddenIdiom,
    /// Reference to a symbol already flagged as a stub
    StubReference,
    /// Required structural section or file header is missing
    MissingHeader,
}

impl ViolationCategory {
    /// Stable machine-readable code for this category
    #[inline]
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncompleteMarker => "INCOMPLETE_MARKER",
            Self::EmptyBody => "EMPTY_BODY",
            Self::SwallowedError => "SWALLOWED_ERROR",
            Self::ForbiddenIdiom => "FORBIDDEN_IDIOM",
            Self::StubReference => "STUB_REFERENCE",
            Self::MissingHeader => "MISSING_HEADER",
        }
    }
}

impl Display for ViolationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single hard-blocking policy finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// What kind of violation this is
    pub category: ViolationCategory,
    /// Human-readable description
    pub message: String,
    /// 1-based source line of the finding
    pub line: usize,
    /// 1-based column of the finding
    pub column: usize,
}

impl PolicyViolation {
    /// Create a violation at a source location
    #[must_use]
    pub fn new(
        category: ViolationCategory,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            line,
            column,
        }
    }

    /// Create a violation with no meaningful location (structural findings)
    #[must_use]
    pub fn structural(category: ViolationCategory, message: impl Into<String>) -> Self {
        Self::new(category, message, 0, 0)
    }
}

impl Display for PolicyViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.category, self.message)
        } else {
            write!(
                f,
                "{} at {}:{}: {}",
                self.category, self.line, self.column, self.message
            )
        }
    }
}
