use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Severity attached to a failing column rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Directive,
    Expression,
    Version,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Directive => write!(f, "directive"),
            Self::Expression => write!(f, "expression"),
            Self::Version => write!(f, "version"),
        }
    }
}

/// Numeric error code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_CHILD: Self = Self(100);
    pub const WRONG_ARITY: Self = Self(101);
    pub const UNKNOWN_NODE: Self = Self(102);
    pub const MALFORMED_TREE: Self = Self(103);

    // ── Directive errors (E200–E299) ──
    pub const UNKNOWN_DIRECTIVE: Self = Self(200);
    pub const DUPLICATE_DIRECTIVE: Self = Self(201);
    pub const CONFLICTING_DIRECTIVES: Self = Self(202);
    pub const INVALID_DIRECTIVE_VALUE: Self = Self(203);

    // ── Expression configuration errors (E300–E399) ──
    pub const UNSUPPORTED_HASH_ALGORITHM: Self = Self(300);
    pub const INVALID_PATTERN: Self = Self(301);
    pub const INVALID_BOUND: Self = Self(302);
    pub const UNKNOWN_FOLDER_SPECIFICATION: Self = Self(303);
    pub const DUPLICATE_COLUMN: Self = Self(304);

    // ── Version errors (E400–E499) ──
    pub const MISSING_VERSION: Self = Self(400);
    pub const UNSUPPORTED_VERSION: Self = Self(401);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Directive,
            300..=399 => ErrorCategory::Expression,
            400..=499 => ErrorCategory::Version,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A fatal schema compilation error.
///
/// Compilation is fail-fast: the first structural or configuration problem
/// aborts the build and is surfaced as exactly one `SchemaError`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code} [{category}] {message}")]
pub struct SchemaError {
    /// Error code (e.g., E201).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Tag of the parse node being reduced when the error was raised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Source location, when the parser supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SchemaError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            node: None,
            span: None,
            suggestion: None,
        }
    }

    /// Attach the tag of the offending parse node.
    ///
    /// The innermost node wins: once set, later (outer) calls are no-ops.
    pub fn at_node(mut self, tag: impl Into<String>, span: Option<Span>) -> Self {
        if self.node.is_none() {
            self.node = Some(tag.into());
        }
        self.span = self.span.or(span);
        self
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
