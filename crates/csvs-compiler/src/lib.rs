//! CSV Schema compiler: orchestrates the full pipeline.
//!
//! ```text
//! schema text → (external parser) → ParseNode → Tree Builder → Schema → Validator → Report
//! ```
//!
//! The grammar-driven parser lives outside this workspace; it hands over a
//! generic [`ParseNode`] tree, either directly or as JSON.

mod render;

use std::io;
use std::path::Path;

use csvs_eval::{EvalError, ValidationOptions, ValidationOutcome, Validator};
use csvs_types::ast::Schema;
use csvs_types::{first_non_blank_line, ErrorCode, ParseNode, SchemaError, Span, Version};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

pub use csvs_types::Result;
pub use render::render;

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

/// Failure of a compile-and-validate call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Run(#[from] EvalError),
}

// ══════════════════════════════════════════════════════════════════════════════
// Compilation
// ══════════════════════════════════════════════════════════════════════════════

/// Build a typed schema from a parse tree.
pub fn compile(tree: &ParseNode) -> Result<Schema> {
    let schema = csvs_builder::build(tree)?;
    info!(
        version = %schema.prolog.version,
        columns = schema.columns().len(),
        "schema compiled"
    );
    Ok(schema)
}

/// Build a typed schema from a parse tree serialized as JSON.
pub fn compile_json(json: &str) -> Result<Schema> {
    let tree: ParseNode = serde_json::from_str(json).map_err(|e| {
        SchemaError::new(
            ErrorCode::MALFORMED_TREE,
            format!("parse tree is not valid JSON: {e}"),
        )
        .with_suggestion("expected {\"tag\": ..., \"children\": [...]} nodes")
    })?;
    compile(&tree)
}

/// One compiled column, as shown in a [`CompileResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledColumn {
    pub name: String,
    /// Rule expressions rendered in schema syntax.
    pub rules: Vec<String>,
}

/// Structured compilation outcome, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default)]
    pub columns: Vec<CompiledColumn>,
    /// SHA-256 of the canonical schema text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SchemaError>,
}

/// Compile and report the outcome as data instead of a `Result`.
pub fn compile_to_result(tree: &ParseNode) -> CompileResult {
    match compile(tree) {
        Ok(schema) => CompileResult {
            success: true,
            version: Some(schema.prolog.version),
            columns: schema
                .columns()
                .iter()
                .map(|c| CompiledColumn {
                    name: c.name.clone(),
                    rules: c.rule.exprs.iter().map(ToString::to_string).collect(),
                })
                .collect(),
            fingerprint: Some(fingerprint(&schema)),
            error: None,
        },
        Err(error) => {
            debug!(code = %error.code, "schema compilation failed");
            CompileResult {
                success: false,
                version: None,
                columns: Vec::new(),
                fingerprint: None,
                error: Some(error),
            }
        }
    }
}

/// Hex SHA-256 of the canonical rendering; equal schemas share a fingerprint.
pub fn fingerprint(schema: &Schema) -> String {
    format!("{:x}", Sha256::digest(render(schema).as_bytes()))
}

/// Read the `version` declaration from the first non-blank line of schema text.
pub fn sniff_version(text: &str) -> Result<Version> {
    let Some((line_number, line)) = first_non_blank_line(text) else {
        return Err(SchemaError::new(
            ErrorCode::MISSING_VERSION,
            "schema is empty, expected a version declaration",
        ));
    };
    let span = Span::line(line_number, line.len());
    let declared = line
        .trim()
        .strip_prefix("version")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .ok_or_else(|| {
            SchemaError::new(
                ErrorCode::MISSING_VERSION,
                format!("expected 'version <n>', found '{}'", line.trim()),
            )
            .at_node("version_decl", Some(span))
            .with_suggestion("start the schema with a line such as 'version 1.2'")
        })?;
    declared.trim().parse().map_err(|msg: String| {
        SchemaError::new(ErrorCode::UNSUPPORTED_VERSION, msg).at_node("version_decl", Some(span))
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════════════════════════

/// Compile `tree` and validate the CSV file at `path` against it.
pub fn validate_path(
    tree: &ParseNode,
    path: impl AsRef<Path>,
    options: ValidationOptions,
) -> std::result::Result<ValidationOutcome, PipelineError> {
    let schema = compile(tree)?;
    Ok(Validator::new(&schema)
        .with_options(options)
        .validate_path(path)?)
}

/// Compile `tree` and validate CSV read from `reader` against it.
pub fn validate_reader<R: io::Read>(
    tree: &ParseNode,
    reader: R,
    options: ValidationOptions,
) -> std::result::Result<ValidationOutcome, PipelineError> {
    let schema = compile(tree)?;
    Ok(Validator::new(&schema)
        .with_options(options)
        .validate_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_version() {
        assert_eq!(sniff_version("\n\n  version 1.1\n@noHeader").unwrap(), Version::V1_1);
        assert_eq!(sniff_version("version 1.0").unwrap(), Version::V1_0);
    }

    #[test]
    fn test_sniff_version_errors() {
        assert_eq!(sniff_version("   \n").unwrap_err().code, ErrorCode::MISSING_VERSION);

        let err = sniff_version("\nid: notEmpty").unwrap_err();
        assert_eq!(err.code, ErrorCode::MISSING_VERSION);
        assert_eq!(err.span.map(|s| s.start_line), Some(2));

        assert_eq!(sniff_version("versions 1.0").unwrap_err().code, ErrorCode::MISSING_VERSION);
        assert_eq!(sniff_version("version 2.0").unwrap_err().code, ErrorCode::UNSUPPORTED_VERSION);
    }

    #[test]
    fn test_compile_json_rejects_garbage() {
        let err = compile_json("{ not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::MALFORMED_TREE);
    }
}
