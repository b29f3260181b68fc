//! Validating expression reducers.
//!
//! Literal configuration (patterns, bounds, hash names, folder
//! specifications) is parsed here so a bad schema fails at compile time
//! rather than on the first row.

use std::fmt::Display;

use csvs_types::ast::*;
use csvs_types::temporal;
use csvs_types::{ErrorCode, FolderSpec, HashAlgorithm, Result};

use crate::builder::{unquote, Builder, Children, Reduced};

/// `*` marks an open end.
fn is_open(raw: &str) -> bool {
    unquote(raw) == "*"
}

/// Parse both ends of a range, then require `start <= end`.
fn bounds<T: PartialOrd + Display>(
    c: &mut Children<'_>,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Bounds<T>> {
    let mut ends = [None, None];
    for end in &mut ends {
        let raw = c.text()?;
        if is_open(&raw) {
            continue;
        }
        let value = parse(&unquote(&raw)).ok_or_else(|| {
            c.error(
                ErrorCode::INVALID_BOUND,
                format!("'{}' is not a valid {what} bound", raw.trim()),
            )
        })?;
        *end = Some(value);
    }
    let [start, end] = ends;
    if let (Some(s), Some(e)) = (&start, &end) {
        if s > e {
            return Err(c.error(
                ErrorCode::INVALID_BOUND,
                format!("{what} lower bound {s} is greater than upper bound {e}"),
            ));
        }
    }
    Ok(Bounds::new(start, end))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_length(text: &str) -> Option<usize> {
    text.trim().parse().ok()
}

/// An `if_clause`, or a single bare expression standing in for one.
fn clause(c: &mut Children<'_>) -> Result<IfClause> {
    match c.peek() {
        Some(Reduced::Validating(_) | Reduced::ColumnValidation(_)) => Ok(IfClause {
            exprs: vec![c.column_validation()?],
        }),
        _ => c.if_clause(),
    }
}

fn validating(expr: ValidatingExpr) -> Result<Reduced> {
    Ok(Reduced::Validating(expr))
}

impl Builder {
    // ══════════════════════════════════════════════════════════════════════════
    // Wrappers and combinators
    // ══════════════════════════════════════════════════════════════════════════

    /// `[column_ref] expr`
    pub(crate) fn reduce_single(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1, 2])?;
        let column = if c.len() == 2 {
            Some(c.column_ref()?)
        } else {
            None
        };
        let expr = Box::new(c.validating()?);
        c.finish()?;
        validating(ValidatingExpr::Single { expr, column })
    }

    pub(crate) fn reduce_parenthesized(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(1)?;
        let exprs = c.rest(Children::column_validation)?;
        validating(ValidatingExpr::Parenthesized(exprs))
    }

    pub(crate) fn reduce_logical(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(2)?;
        let exprs = c.rest(Children::validating)?;
        if c.tag() == "or_expr" {
            validating(ValidatingExpr::Or(exprs))
        } else {
            validating(ValidatingExpr::And(exprs))
        }
    }

    /// `if(condition, then [, else])`
    pub(crate) fn reduce_if(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2, 3])?;
        let condition = Box::new(c.validating()?);
        let then = clause(&mut c)?;
        let otherwise = if c.is_empty() {
            None
        } else {
            Some(clause(&mut c)?)
        };
        c.finish()?;
        validating(ValidatingExpr::If {
            condition,
            then,
            otherwise,
        })
    }

    pub(crate) fn reduce_if_clause(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(1)?;
        let exprs = c.rest(Children::column_validation)?;
        Ok(Reduced::IfClause(IfClause { exprs }))
    }

    /// `switch(case+ [, else])`
    pub(crate) fn reduce_switch(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(1)?;
        let mut cases = Vec::new();
        while matches!(c.peek(), Some(Reduced::SwitchCase(_))) {
            cases.push(c.switch_case()?);
        }
        if cases.is_empty() {
            return Err(c.expected("switch case"));
        }
        let otherwise = if c.is_empty() {
            None
        } else {
            Some(clause(&mut c)?)
        };
        c.finish()?;
        validating(ValidatingExpr::Switch { cases, otherwise })
    }

    pub(crate) fn reduce_switch_case(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2])?;
        let condition = Box::new(c.validating()?);
        let clause = clause(&mut c)?;
        c.finish()?;
        Ok(Reduced::SwitchCase(SwitchCase { condition, clause }))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Comparisons
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn reduce_comparison(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let tag = c.tag();
        let operand = c.data()?;
        c.finish()?;
        let expr = match tag {
            "is_expr" => ValidatingExpr::Is(operand),
            "not_expr" => ValidatingExpr::Not(operand),
            "in_expr" => ValidatingExpr::In(operand),
            "starts_with_expr" => ValidatingExpr::StartsWith(operand),
            _ => ValidatingExpr::EndsWith(operand),
        };
        validating(expr)
    }

    pub(crate) fn reduce_any(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(1)?;
        let values = c.rest(Children::data)?;
        validating(ValidatingExpr::Any(values))
    }

    pub(crate) fn reduce_regexp(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let raw = c.text()?;
        let pattern = Pattern::new(&unquote(&raw)).map_err(|e| {
            c.error(
                ErrorCode::INVALID_PATTERN,
                format!("invalid regular expression {}: {e}", raw.trim()),
            )
        })?;
        c.finish()?;
        validating(ValidatingExpr::RegExp(pattern))
    }

    pub(crate) fn reduce_range(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2])?;
        let range = bounds(&mut c, "range", parse_number)?;
        c.finish()?;
        validating(ValidatingExpr::Range(range))
    }

    /// `length(n)`, `length(start, end)`; either end of the pair may be `*`.
    pub(crate) fn reduce_length(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1, 2])?;
        let spec = if c.len() == 1 {
            let raw = c.text()?;
            let n = parse_length(&unquote(&raw)).ok_or_else(|| {
                c.error(
                    ErrorCode::INVALID_BOUND,
                    format!("'{}' is not a valid length", raw.trim()),
                )
            })?;
            LengthSpec::Exact(n)
        } else {
            LengthSpec::Between(bounds(&mut c, "length", parse_length)?)
        };
        c.finish()?;
        validating(ValidatingExpr::Length(spec))
    }

    pub(crate) fn reduce_nullary(&mut self, c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[0])?;
        let expr = match c.tag() {
            "empty_expr" => ValidatingExpr::Empty,
            "not_empty_expr" => ValidatingExpr::NotEmpty,
            "uri_expr" => ValidatingExpr::Uri,
            "uuid4_expr" => ValidatingExpr::Uuid4,
            "positive_integer_expr" => ValidatingExpr::PositiveInteger,
            "uppercase_expr" => ValidatingExpr::Uppercase,
            "lowercase_expr" => ValidatingExpr::Lowercase,
            "partial_uk_date_expr" => ValidatingExpr::PartialUkDate,
            other => {
                return Err(c.error(
                    ErrorCode::UNKNOWN_NODE,
                    format!("'{other}' is not a nullary expression"),
                ))
            }
        };
        validating(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Stateful
    // ══════════════════════════════════════════════════════════════════════════

    /// `unique` or `unique($a, $b, ...)`
    pub(crate) fn reduce_unique(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let columns = c.rest(Children::column_ref)?;
        validating(ValidatingExpr::Unique {
            columns,
            slot: self.alloc_slot(),
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Dates and times
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn reduce_temporal(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[0, 2])?;
        let ranged = !c.is_empty();
        let expr = match c.tag() {
            "xsd_datetime_expr" => ValidatingExpr::XsdDateTime(if ranged {
                bounds(&mut c, "xDateTime", temporal::parse_xsd_datetime)?
            } else {
                Bounds::unbounded()
            }),
            "xsd_datetime_with_timezone_expr" => {
                ValidatingExpr::XsdDateTimeWithTimezone(if ranged {
                    bounds(&mut c, "xDateTimeTz", temporal::parse_xsd_datetime_tz)?
                } else {
                    Bounds::unbounded()
                })
            }
            "xsd_date_expr" => ValidatingExpr::XsdDate(if ranged {
                bounds(&mut c, "xDate", temporal::parse_xsd_date)?
            } else {
                Bounds::unbounded()
            }),
            "xsd_time_expr" => ValidatingExpr::XsdTime(if ranged {
                bounds(&mut c, "xTime", temporal::parse_xsd_time)?
            } else {
                Bounds::unbounded()
            }),
            _ => ValidatingExpr::UkDate(if ranged {
                bounds(&mut c, "ukDate", temporal::parse_uk_date)?
            } else {
                Bounds::unbounded()
            }),
        };
        c.finish()?;
        validating(expr)
    }

    /// `date(year, month, day [, start, end])`, bounds written as `xDate`s.
    pub(crate) fn reduce_date(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[3, 5])?;
        let year = c.data()?;
        let month = c.data()?;
        let day = c.data()?;
        let range = if c.is_empty() {
            Bounds::unbounded()
        } else {
            bounds(&mut c, "date", temporal::parse_xsd_date)?
        };
        c.finish()?;
        validating(ValidatingExpr::Date {
            year,
            month,
            day,
            range,
        })
    }

    pub(crate) fn reduce_partial_date(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[3])?;
        let year = c.data()?;
        let month = c.data()?;
        let day = c.data()?;
        c.finish()?;
        validating(ValidatingExpr::PartialDate { year, month, day })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Filesystem
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn reduce_file_exists(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[0, 1])?;
        let prefix = if c.is_empty() { None } else { Some(c.data()?) };
        c.finish()?;
        validating(ValidatingExpr::FileExists { prefix })
    }

    /// `integrityCheck([prefix, [subfolder,]] "includeFolder" | "excludeFolder")`
    pub(crate) fn reduce_integrity_check(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1, 2, 3])?;
        let prefix = if c.len() >= 2 { Some(c.data()?) } else { None };
        let subfolder = if c.len() == 2 { Some(c.data()?) } else { None };
        let raw = c.text()?;
        let folders: FolderSpec = unquote(&raw)
            .parse()
            .map_err(|msg: String| c.error(ErrorCode::UNKNOWN_FOLDER_SPECIFICATION, msg))?;
        c.finish()?;
        validating(ValidatingExpr::IntegrityCheck {
            prefix,
            subfolder,
            folders,
            slot: self.alloc_slot(),
        })
    }

    pub(crate) fn reduce_checksum(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2])?;
        let file = c.data()?;
        let raw = c.text()?;
        let algorithm: HashAlgorithm = unquote(&raw).parse().map_err(|msg: String| {
            c.error(ErrorCode::UNSUPPORTED_HASH_ALGORITHM, msg)
                .with_suggestion("supported algorithms are SHA-224, SHA-256, SHA-384, SHA-512, SHA-512/224 and SHA-512/256")
        })?;
        c.finish()?;
        validating(ValidatingExpr::Checksum { file, algorithm })
    }

    pub(crate) fn reduce_file_count(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let file = c.data()?;
        c.finish()?;
        validating(ValidatingExpr::FileCount { file })
    }
}
