//! Shared types for the CSV Schema toolchain.
//!
//! This crate defines the generic parse tree handed over by the external
//! parser, the compiled schema model, source spans, error types, and the
//! fixed vocabularies (directives, versions, hash names) used by every stage.

mod error;
mod span;
pub mod ast;
pub mod temporal;
pub mod tree;
pub mod vocab;

pub use error::{ErrorCategory, ErrorCode, SchemaError, Severity};
pub use span::{first_non_blank_line, Span};
pub use tree::{ParseChild, ParseNode};
pub use vocab::{FolderSpec, HashAlgorithm, Version};

/// Result type used throughout schema compilation.
pub type Result<T> = std::result::Result<T, SchemaError>;
