//! End-to-end pipeline tests.
//!
//! Parse trees arrive as JSON (the way an external parser hands them over),
//! are compiled into a schema, and CSV input is validated against it.

use csvs_compiler::{
    compile, compile_json, compile_to_result, fingerprint, render, sniff_version,
    validate_path, validate_reader, CompileResult, PipelineError,
};
use csvs_eval::{EvalError, ValidationOptions};
use csvs_types::{ErrorCode, ParseNode, Severity, Version};

// ══════════════════════════════════════════════════════════════════════════════
// Schemas
// ══════════════════════════════════════════════════════════════════════════════

/// ```text
/// version 1.2
/// @totalColumns 3
/// id: uuid4 unique
/// name: notEmpty length(1, 20)
/// age: range(0, 150) @optional
/// ```
const PEOPLE: &str = r#"
{ "tag": "start", "children": [
  { "tag": "schema", "children": [
    { "tag": "prolog", "children": [
      { "tag": "version_decl", "children": ["version 1.2"] },
      { "tag": "global_directives", "children": [
        { "tag": "total_columns_directive", "children": ["3"] } ] } ] },
    { "tag": "body", "children": [
      { "tag": "body_part", "children": [
        { "tag": "column_definition", "children": [
          "id",
          { "tag": "column_rule", "children": [
            { "tag": "column_validation_expr", "children": [
              { "tag": "single_expr", "children": [ { "tag": "uuid4_expr" } ] } ] },
            { "tag": "column_validation_expr", "children": [
              { "tag": "single_expr", "children": [ { "tag": "unique_expr" } ] } ] } ] } ] } ] },
      { "tag": "body_part", "children": [ { "tag": "comment", "children": ["// people"] } ] },
      { "tag": "body_part", "children": [
        { "tag": "column_definition", "children": [
          "name",
          { "tag": "column_rule", "children": [
            { "tag": "column_validation_expr", "children": [
              { "tag": "single_expr", "children": [ { "tag": "not_empty_expr" } ] } ] },
            { "tag": "column_validation_expr", "children": [
              { "tag": "single_expr", "children": [
                { "tag": "length_expr", "children": ["1", "20"] } ] } ] } ] } ] } ] },
      { "tag": "body_part", "children": [
        { "tag": "column_definition", "children": [
          "age",
          { "tag": "column_rule", "children": [
            { "tag": "column_validation_expr", "children": [
              { "tag": "single_expr", "children": [
                { "tag": "range_expr", "children": ["0", "150"] } ] } ] },
            { "tag": "column_directives", "children": [
              { "tag": "optional_directive" } ] } ] } ] } ] } ] } ] } ] }
"#;

/// `@noHeader` and `@ignoreColumnNameCase` together.
const CONFLICTING: &str = r#"
{ "tag": "start", "children": [
  { "tag": "schema", "children": [
    { "tag": "prolog", "children": [
      "1.2",
      { "tag": "global_directives", "children": [
        { "tag": "no_header_directive" },
        { "tag": "ignore_column_name_case_directive" } ] } ] },
    { "tag": "body", "children": [] } ] } ] }
"#;

fn people_tree() -> ParseNode {
    serde_json::from_str(PEOPLE).unwrap()
}

const ADA: &str = "4b9e2c1e-8f3a-4d2b-9c7e-1a2b3c4d5e6f";
const BOB: &str = "0f1e2d3c-4b5a-4978-8695-a4b3c2d1e0f9";

// ══════════════════════════════════════════════════════════════════════════════
// 1. Compilation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_json_tree_compiles() {
    let schema = compile_json(PEOPLE).unwrap();
    assert_eq!(schema.prolog.version, Version::V1_2);
    assert_eq!(schema.directives().total_columns, Some(3));
    let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "age"]);
    assert!(schema.columns()[2].rule.directives.optional);
    assert_eq!(schema.state_slots(), 1);
}

#[test]
fn test_conflicting_directives_fail_fast() {
    let err = compile_json(CONFLICTING).unwrap_err();
    assert_eq!(err.code, ErrorCode::CONFLICTING_DIRECTIVES);
}

#[test]
fn test_render_shows_schema_syntax() {
    let schema = compile_json(PEOPLE).unwrap();
    let text = render(&schema);
    assert!(text.starts_with("version 1.2\n@totalColumns 3\n"));
    assert!(text.contains("age: range(0, 150) @optional\n"));
    assert_eq!(sniff_version(&text).unwrap(), Version::V1_2);
}

// ══════════════════════════════════════════════════════════════════════════════
// 2. Structured output
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_success_result_json() {
    let result = compile_to_result(&people_tree());
    assert!(result.success);
    assert!(result.error.is_none());
    assert_eq!(result.columns.len(), 3);

    let parsed = serde_json::to_value(&result).unwrap();
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["version"], "1.2");
    assert_eq!(parsed["columns"][0]["name"], "id");
    assert_eq!(parsed["fingerprint"].as_str().map(str::len), Some(64));
}

#[test]
fn test_failure_result_json() {
    let tree: ParseNode = serde_json::from_str(CONFLICTING).unwrap();
    let result = compile_to_result(&tree);
    assert!(!result.success);
    assert!(result.fingerprint.is_none());

    let parsed = serde_json::to_value(&result).unwrap();
    assert_eq!(parsed["success"], false);
    assert_eq!(parsed["error"]["code"], 202);
    assert_eq!(parsed["error"]["category"], "directive");
    assert!(parsed.get("fingerprint").is_none());
}

#[test]
fn test_compile_result_json_roundtrip() {
    let result = compile_to_result(&people_tree());
    let json = serde_json::to_string(&result).unwrap();
    let back: CompileResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

// ══════════════════════════════════════════════════════════════════════════════
// 3. Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeated_builds_are_identical() {
    let tree = people_tree();
    let first = compile(&tree).unwrap();
    for _ in 0..10 {
        let again = compile(&tree).unwrap();
        assert_eq!(again, first);
        assert_eq!(fingerprint(&again), fingerprint(&first));
    }
}

#[test]
fn test_fingerprint_tracks_content() {
    let a = compile_json(PEOPLE).unwrap();
    let b = compile_json(&PEOPLE.replace("\"150\"", "\"120\"")).unwrap();
    assert_ne!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn test_repeated_runs_report_identically() {
    let tree = people_tree();
    let csv = format!("id,name,age\n{ADA},Ada,36\n{ADA},,200\n");
    let first = validate_reader(&tree, csv.as_bytes(), ValidationOptions::default()).unwrap();
    for _ in 0..5 {
        let again = validate_reader(&tree, csv.as_bytes(), ValidationOptions::default()).unwrap();
        assert_eq!(again, first);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// 4. Validation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_validate_reader_end_to_end() {
    let csv = format!("id,name,age\n{ADA},Ada,36\n{BOB},Bob,\n{ADA},,200\n");
    let outcome =
        validate_reader(&people_tree(), csv.as_bytes(), ValidationOptions::default()).unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.rows, 3);
    assert!(outcome.report.row(2).is_none());
    assert!(outcome.report.row(3).is_none());
    // duplicate id, empty name (notEmpty and length), out-of-range age
    assert_eq!(outcome.report.get(4, "id", Severity::Error).len(), 1);
    assert_eq!(outcome.report.get(4, "name", Severity::Error).len(), 2);
    assert_eq!(outcome.report.get(4, "age", Severity::Error).len(), 1);
    assert_eq!(outcome.report.error_count(), 4);
}

#[test]
fn test_validate_path_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    std::fs::write(&path, format!("id,name,age\n{ADA},Ada,36\n")).unwrap();
    let outcome = validate_path(&people_tree(), &path, ValidationOptions::default()).unwrap();
    assert!(outcome.valid);
    assert!(outcome.report.is_empty());
}

#[test]
fn test_column_count_mismatch_is_run_error() {
    let csv = "id,name,age,extra\n";
    let err = validate_reader(&people_tree(), csv.as_bytes(), ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Run(EvalError::ColumnCount {
            expected: 3,
            found: 4
        })
    ));
}

#[test]
fn test_schema_error_surfaces_before_reading() {
    let tree: ParseNode = serde_json::from_str(CONFLICTING).unwrap();
    let err = validate_path(&tree, "/no/such/file.csv", ValidationOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Schema(e) if e.code == ErrorCode::CONFLICTING_DIRECTIVES));
}
