//! Core builder infrastructure: node reduction, child cursors, dispatch.
//!
//! Reduction is post-order. Every node's children are reduced first, then
//! the node's tag selects a reducer that consumes exactly those children.
//! Nothing is shared between siblings, so a list node knows its length
//! from the child list itself.

use std::collections::VecDeque;

use csvs_types::ast::*;
use csvs_types::vocab::{self, ColumnKey};
use csvs_types::{ErrorCode, ParseChild, ParseNode, Result, SchemaError, Span};
use tracing::{debug, trace};

use crate::build_prolog::GlobalSetting;

/// Deepest nesting accepted before the tree is rejected as malformed.
pub const MAX_DEPTH: usize = 256;

/// The value a node reduces to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reduced {
    Text(String),
    Comment,
    GlobalSetting(GlobalSetting),
    GlobalDirectives(GlobalDirectives),
    Prolog(Prolog),
    Body(Body),
    ColumnDefinition(ColumnDefinition),
    ColumnRule(ColumnRule),
    ColumnDirective(ColumnKey),
    ColumnDirectives(ColumnDirectives),
    ColumnValidation(ColumnValidationExpr),
    Validating(ValidatingExpr),
    IfClause(IfClause),
    SwitchCase(SwitchCase),
    Data(DataExpr),
    Schema(Schema),
}

impl Reduced {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "token",
            Self::Comment => "comment",
            Self::GlobalSetting(_) => "global directive",
            Self::GlobalDirectives(_) => "global directives",
            Self::Prolog(_) => "prolog",
            Self::Body(_) => "body",
            Self::ColumnDefinition(_) => "column definition",
            Self::ColumnRule(_) => "column rule",
            Self::ColumnDirective(_) => "column directive",
            Self::ColumnDirectives(_) => "column directives",
            Self::ColumnValidation(_) | Self::Validating(_) => "validating expression",
            Self::IfClause(_) => "if clause",
            Self::SwitchCase(_) => "switch case",
            Self::Data(_) => "data expression",
            Self::Schema(_) => "schema",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Children cursor
// ══════════════════════════════════════════════════════════════════════════════

/// The reduced children of one node, consumed front to back by its reducer.
pub(crate) struct Children<'n> {
    tag: &'n str,
    span: Option<Span>,
    items: VecDeque<Reduced>,
}

impl<'n> Children<'n> {
    pub(crate) fn new(tag: &'n str, span: Option<Span>, items: Vec<Reduced>) -> Self {
        Self {
            tag,
            span,
            items: items.into(),
        }
    }

    pub(crate) fn tag(&self) -> &'n str {
        self.tag
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn error(&self, code: ErrorCode, message: impl Into<String>) -> SchemaError {
        SchemaError::new(code, message).at_node(self.tag, self.span)
    }

    // ── Arity ──

    /// Require one of the listed child counts.
    pub(crate) fn expect_count(&self, allowed: &[usize]) -> Result<()> {
        if allowed.contains(&self.len()) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(self.error(
            ErrorCode::WRONG_ARITY,
            format!("expected {expected} children, got {}", self.len()),
        ))
    }

    pub(crate) fn expect_at_least(&self, min: usize) -> Result<()> {
        if self.len() >= min {
            Ok(())
        } else {
            Err(self.error(
                ErrorCode::WRONG_ARITY,
                format!("expected at least {min} children, got {}", self.len()),
            ))
        }
    }

    // ── Typed pops ──

    fn next(&mut self, wanted: &str) -> Result<Reduced> {
        self.items
            .pop_front()
            .ok_or_else(|| self.error(ErrorCode::WRONG_ARITY, format!("missing {wanted}")))
    }

    fn mismatch(&self, wanted: &str, found: &Reduced) -> SchemaError {
        self.error(
            ErrorCode::UNEXPECTED_CHILD,
            format!("expected {wanted}, found {}", found.kind()),
        )
    }

    /// Error for a missing or wrongly typed front child.
    pub(crate) fn expected(&self, wanted: &str) -> SchemaError {
        match self.peek() {
            Some(found) => self.mismatch(wanted, found),
            None => self.error(ErrorCode::WRONG_ARITY, format!("missing {wanted}")),
        }
    }

    pub(crate) fn peek(&self) -> Option<&Reduced> {
        self.items.front()
    }

    pub(crate) fn text(&mut self) -> Result<String> {
        match self.next("token")? {
            Reduced::Text(t) => Ok(t),
            other => Err(self.mismatch("token", &other)),
        }
    }

    /// A data expression. A bare token is accepted as a literal.
    pub(crate) fn data(&mut self) -> Result<DataExpr> {
        match self.next("data expression")? {
            Reduced::Data(d) => Ok(d),
            Reduced::Text(t) => Ok(DataExpr::literal(unquote(&t))),
            other => Err(self.mismatch("data expression", &other)),
        }
    }

    pub(crate) fn column_ref(&mut self) -> Result<ColumnRef> {
        match self.next("column reference")? {
            Reduced::Data(DataExpr::ColumnRef(c)) => Ok(c),
            other => Err(self.mismatch("column reference", &other)),
        }
    }

    pub(crate) fn validating(&mut self) -> Result<ValidatingExpr> {
        match self.next("validating expression")? {
            Reduced::Validating(v) => Ok(v),
            Reduced::ColumnValidation(c) => Ok(c.expr),
            other => Err(self.mismatch("validating expression", &other)),
        }
    }

    pub(crate) fn column_validation(&mut self) -> Result<ColumnValidationExpr> {
        self.validating().map(ColumnValidationExpr::new)
    }

    pub(crate) fn if_clause(&mut self) -> Result<IfClause> {
        match self.next("if clause")? {
            Reduced::IfClause(c) => Ok(c),
            other => Err(self.mismatch("if clause", &other)),
        }
    }

    pub(crate) fn switch_case(&mut self) -> Result<SwitchCase> {
        match self.next("switch case")? {
            Reduced::SwitchCase(c) => Ok(c),
            other => Err(self.mismatch("switch case", &other)),
        }
    }

    /// Pop the front child if `pred` accepts it.
    pub(crate) fn take_if(&mut self, pred: impl Fn(&Reduced) -> bool) -> Option<Reduced> {
        if self.peek().is_some_and(pred) {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Apply `pop` to every remaining child.
    pub(crate) fn rest<T>(&mut self, mut pop: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.len());
        while !self.is_empty() {
            out.push(pop(self)?);
        }
        Ok(out)
    }

    /// Every child must have been consumed.
    pub(crate) fn finish(mut self) -> Result<()> {
        match self.items.pop_front() {
            None => Ok(()),
            Some(extra) => Err(self.error(
                ErrorCode::UNEXPECTED_CHILD,
                format!("unexpected {} after the last expected child", extra.kind()),
            )),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Token helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Strip one pair of matching surrounding quotes.
pub(crate) fn unquote(text: &str) -> String {
    let t = text.trim();
    for q in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return t[1..t.len() - 1].to_string();
        }
    }
    t.to_string()
}

/// Column reference text: leading `$` dropped, quotes stripped.
pub(crate) fn column_name(text: &str) -> String {
    let t = text.trim();
    unquote(t.strip_prefix('$').unwrap_or(t))
}

// ══════════════════════════════════════════════════════════════════════════════
// Builder
// ══════════════════════════════════════════════════════════════════════════════

/// Turns a [`ParseNode`] tree into a [`Schema`].
///
/// A builder allocates the state slots of the one schema it builds; use a
/// fresh builder per tree.
#[derive(Debug, Default)]
pub struct Builder {
    next_slot: usize,
    depth: usize,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce the whole tree. The root must reduce to a schema.
    pub fn build(mut self, tree: &ParseNode) -> Result<Schema> {
        match self.reduce(tree)? {
            Reduced::Schema(schema) => {
                debug!(
                    version = %schema.prolog.version,
                    columns = schema.columns().len(),
                    state_slots = schema.state_slots(),
                    "schema built"
                );
                Ok(schema)
            }
            other => Err(SchemaError::new(
                ErrorCode::MALFORMED_TREE,
                format!("tree root reduced to {}, expected a schema", other.kind()),
            )
            .at_node(&tree.tag, tree.span)),
        }
    }

    pub(crate) fn alloc_slot(&mut self) -> StateSlot {
        let slot = StateSlot(self.next_slot);
        self.next_slot += 1;
        slot
    }

    pub(crate) fn slots_allocated(&self) -> usize {
        self.next_slot
    }

    fn reduce(&mut self, node: &ParseNode) -> Result<Reduced> {
        if self.depth >= MAX_DEPTH {
            return Err(SchemaError::new(
                ErrorCode::MALFORMED_TREE,
                format!("tree nesting exceeds {MAX_DEPTH} levels"),
            )
            .at_node(&node.tag, node.span));
        }
        self.depth += 1;
        let reduced = self.reduce_children(node).and_then(|items| {
            let declared = items.len();
            let out = self.dispatch(Children::new(&node.tag, node.span, items));
            trace!(tag = %node.tag, children = declared, "reduced node");
            out
        });
        self.depth -= 1;
        reduced.map_err(|e| e.at_node(&node.tag, node.span))
    }

    fn reduce_children(&mut self, node: &ParseNode) -> Result<Vec<Reduced>> {
        let mut items = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let reduced = match child {
                ParseChild::Token(text) => Reduced::Text(text.clone()),
                ParseChild::Node(inner) => self.reduce(inner)?,
            };
            if reduced != Reduced::Comment {
                items.push(reduced);
            }
        }
        Ok(items)
    }

    /// Select the reducer for a node's tag.
    fn dispatch(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let tag = c.tag();
        let reduced = match tag {
            // ── Document structure ──
            "start" => {
                c.expect_count(&[1])?;
                match c.next("schema")? {
                    schema @ Reduced::Schema(_) => schema,
                    other => return Err(c.mismatch("schema", &other)),
                }
            }
            "schema" => self.reduce_schema(c)?,
            "prolog" => self.reduce_prolog(c)?,
            "global_directives" => self.reduce_global_directives(c)?,
            "body" => self.reduce_body(c)?,
            "comment" => Reduced::Comment,
            // a body part holding only a comment is left empty once the comment is dropped
            "body_part" => {
                c.expect_count(&[0, 1])?;
                c.take_if(|_| true).unwrap_or(Reduced::Comment)
            }
            "column_definition" => self.reduce_column_definition(c)?,
            "column_rule" => self.reduce_column_rule(c)?,
            "column_directives" => self.reduce_column_directives(c)?,
            "column_validation_expr" => {
                c.expect_count(&[1])?;
                let expr = c.column_validation()?;
                c.finish()?;
                Reduced::ColumnValidation(expr)
            }

            // ── Validating expressions ──
            "single_expr" | "external_single_expr" => self.reduce_single(c)?,
            "parenthesized_expr" => self.reduce_parenthesized(c)?,
            "is_expr" | "not_expr" | "in_expr" | "starts_with_expr" | "ends_with_expr" => {
                self.reduce_comparison(c)?
            }
            "any_expr" => self.reduce_any(c)?,
            "reg_exp_expr" => self.reduce_regexp(c)?,
            "range_expr" => self.reduce_range(c)?,
            "length_expr" => self.reduce_length(c)?,
            "empty_expr" | "not_empty_expr" | "uri_expr" | "uuid4_expr"
            | "positive_integer_expr" | "uppercase_expr" | "lowercase_expr"
            | "partial_uk_date_expr" => self.reduce_nullary(c)?,
            "identical_expr" => {
                c.expect_count(&[0])?;
                Reduced::Validating(ValidatingExpr::Identical {
                    slot: self.alloc_slot(),
                })
            }
            "unique_expr" => self.reduce_unique(c)?,
            "xsd_datetime_expr"
            | "xsd_datetime_with_timezone_expr"
            | "xsd_date_expr"
            | "xsd_time_expr"
            | "uk_date_expr" => self.reduce_temporal(c)?,
            "date_expr" => self.reduce_date(c)?,
            "partial_date_expr" => self.reduce_partial_date(c)?,
            "file_exists_expr" => self.reduce_file_exists(c)?,
            "integrity_check_expr" => self.reduce_integrity_check(c)?,
            "checksum_expr" => self.reduce_checksum(c)?,
            "file_count_expr" => self.reduce_file_count(c)?,
            "or_expr" | "and_expr" => self.reduce_logical(c)?,
            "if_expr" => self.reduce_if(c)?,
            "if_clause" => self.reduce_if_clause(c)?,
            "switch_expr" => self.reduce_switch(c)?,
            "switch_case_expr" => self.reduce_switch_case(c)?,

            // ── Data expressions ──
            "string_provider" => self.reduce_string_provider(c)?,
            "column_ref" => self.reduce_column_ref(c)?,
            "concat_expr" => self.reduce_concat(c)?,
            "no_ext_expr" => self.reduce_no_ext(c)?,
            "uri_decode_expr" => self.reduce_uri_decode(c)?,
            "file_expr" => self.reduce_file(c)?,

            // ── Directives and wrappers ──
            _ => {
                if let Some(spec) = vocab::global_directive(tag) {
                    self.reduce_global_directive(spec, c)?
                } else if let Some(spec) = vocab::column_directive(tag) {
                    c.expect_count(&[0])?;
                    Reduced::ColumnDirective(spec.key)
                } else if vocab::looks_like_directive(tag) {
                    return Err(c.error(
                        ErrorCode::UNKNOWN_DIRECTIVE,
                        format!("unknown directive '{tag}'"),
                    ));
                } else if c.len() == 1 {
                    // grammar wrapper
                    c.items.pop_front().ok_or_else(|| {
                        c.error(ErrorCode::MALFORMED_TREE, "wrapper lost its child")
                    })?
                } else {
                    return Err(c.error(
                        ErrorCode::UNKNOWN_NODE,
                        format!("unknown node '{tag}' with {} children", c.len()),
                    ));
                }
            }
        };
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'a b'"), "a b");
        assert_eq!(unquote("\"unterminated"), "\"unterminated");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name("$other"), "other");
        assert_eq!(column_name("$\"with space\""), "with space");
        assert_eq!(column_name("bare"), "bare");
    }

    #[test]
    fn test_children_arity_messages() {
        let c = Children::new("range_expr", None, vec![Reduced::Text("1".into())]);
        let err = c.expect_count(&[2]).unwrap_err();
        assert_eq!(err.code, ErrorCode::WRONG_ARITY);
        assert_eq!(err.message, "expected 2 children, got 1");
        assert_eq!(err.node.as_deref(), Some("range_expr"));
    }

    #[test]
    fn test_children_type_mismatch() {
        let mut c = Children::new("is_expr", None, vec![Reduced::Validating(ValidatingExpr::Uri)]);
        let err = c.data().unwrap_err();
        assert_eq!(err.code, ErrorCode::UNEXPECTED_CHILD);
        assert!(err.message.contains("expected data expression"));
    }

    #[test]
    fn test_finish_rejects_leftovers() {
        let c = Children::new("no_ext_expr", None, vec![Reduced::Text("x".into())]);
        assert_eq!(c.finish().unwrap_err().code, ErrorCode::UNEXPECTED_CHILD);
    }

    #[test]
    fn test_slots_are_sequential() {
        let mut b = Builder::new();
        assert_eq!(b.alloc_slot(), StateSlot(0));
        assert_eq!(b.alloc_slot(), StateSlot(1));
        assert_eq!(b.slots_allocated(), 2);
    }
}
