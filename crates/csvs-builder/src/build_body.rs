//! Body, column definitions, column rules and column directives.

use std::collections::HashSet;

use csvs_types::ast::{Body, ColumnDefinition, ColumnDirectives, ColumnRule};
use csvs_types::vocab::{ColumnKey, COLUMN_DIRECTIVES};
use csvs_types::{ErrorCode, Result};
use tracing::debug;

use crate::builder::{unquote, Builder, Children, Reduced};

impl Builder {
    /// `body := column_definition*` (comments already dropped)
    pub(crate) fn reduce_body(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let columns = c.rest(|c| match c.take_if(|r| matches!(r, Reduced::ColumnDefinition(_))) {
            Some(Reduced::ColumnDefinition(def)) => Ok(def),
            _ => Err(c.expected("column definition")),
        })?;
        debug!(columns = columns.len(), "body reduced");
        Ok(Reduced::Body(Body {
            columns,
            state_slots: self.slots_allocated(),
        }))
    }

    /// `column_definition := name column_rule`
    pub(crate) fn reduce_column_definition(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2])?;
        let raw = c.text()?;
        let name = unquote(raw.trim().trim_end_matches(':').trim_end());
        if name.is_empty() {
            return Err(c.error(ErrorCode::MALFORMED_TREE, "column name is empty"));
        }
        let rule = match c.take_if(|r| matches!(r, Reduced::ColumnRule(_))) {
            Some(Reduced::ColumnRule(rule)) => rule,
            _ => return Err(c.expected("column rule")),
        };
        c.finish()?;
        Ok(Reduced::ColumnDefinition(ColumnDefinition { name, rule }))
    }

    /// `column_rule := column_validation_expr* [column_directives]`
    pub(crate) fn reduce_column_rule(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let mut exprs = Vec::new();
        while matches!(
            c.peek(),
            Some(Reduced::ColumnValidation(_) | Reduced::Validating(_))
        ) {
            exprs.push(c.column_validation()?);
        }
        let directives = match c.take_if(|r| matches!(r, Reduced::ColumnDirectives(_))) {
            Some(Reduced::ColumnDirectives(d)) => d,
            _ => ColumnDirectives::default(),
        };
        c.finish()?;
        Ok(Reduced::ColumnRule(ColumnRule { exprs, directives }))
    }

    pub(crate) fn reduce_column_directives(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let mut directives = ColumnDirectives::default();
        let mut seen = HashSet::new();
        let keys = c.rest(|c| match c.take_if(|r| matches!(r, Reduced::ColumnDirective(_))) {
            Some(Reduced::ColumnDirective(key)) => Ok(key),
            _ => Err(c.expected("column directive")),
        })?;
        for key in keys {
            if !seen.insert(key) {
                let keyword = COLUMN_DIRECTIVES
                    .iter()
                    .find(|d| d.key == key)
                    .map_or("directive", |d| d.keyword);
                return Err(c.error(
                    ErrorCode::DUPLICATE_DIRECTIVE,
                    format!("{keyword} is declared more than once on one column"),
                ));
            }
            match key {
                ColumnKey::Optional => directives.optional = true,
                ColumnKey::MatchIsFalse => directives.match_is_false = true,
                ColumnKey::IgnoreCase => directives.ignore_case = true,
                ColumnKey::Warning => directives.warning = true,
            }
        }
        Ok(Reduced::ColumnDirectives(directives))
    }
}
