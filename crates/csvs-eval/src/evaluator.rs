//! Expression engine: evaluates column rules and validating expressions
//! against one row.

use std::borrow::Cow;
use std::fmt::Display;
use std::path::{Component, Path, PathBuf};

use csvs_types::ast::*;
use csvs_types::{temporal, FolderSpec, Severity};
use tracing::trace;
use uuid::Uuid;

use crate::context::RunContext;
use crate::data::{join_path, to_path};
use crate::fs::Filesystem;
use crate::options::ValidationOptions;
use crate::row::Row;

/// Where a failing expression reports, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Error,
    Warning,
    /// Evaluate silently, e.g. an `or` operand or an `if` condition.
    None,
}

impl ReportLevel {
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Error => Some(Severity::Error),
            Self::Warning => Some(Severity::Warning),
            Self::None => None,
        }
    }
}

impl From<Severity> for ReportLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Error,
            Severity::Warning => Self::Warning,
        }
    }
}

fn folded(text: &str, fold: bool) -> Cow<'_, str> {
    if fold {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}

fn text_eq(a: &str, b: &str, fold: bool) -> bool {
    folded(a, fold) == folded(b, fold)
}

fn is_uuid4(value: &str, fold: bool) -> bool {
    // hyphenated form only; braced, urn and simple forms have other lengths
    if value.len() != 36 || (!fold && value.chars().any(|c| c.is_ascii_uppercase())) {
        return false;
    }
    Uuid::parse_str(value)
        .is_ok_and(|u| u.get_version_num() == 4 && u.get_variant() == uuid::Variant::RFC4122)
}

fn is_positive_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Walks validating expressions for one run.
pub struct Evaluator<'s> {
    pub(crate) directives: &'s GlobalDirectives,
    options: &'s ValidationOptions,
    fs: &'s dyn Filesystem,
    pub ctx: RunContext,
}

impl<'s> Evaluator<'s> {
    pub fn new(schema: &'s Schema, options: &'s ValidationOptions, fs: &'s dyn Filesystem) -> Self {
        Self {
            directives: schema.directives(),
            options,
            fs,
            ctx: RunContext::new(schema.state_slots(), options.memoize_filesystem),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Column rules
    // ══════════════════════════════════════════════════════════════════════

    /// Validate one column of the current row.
    ///
    /// Returns the rule outcome; a `@warning` column may return `false`
    /// without making the row invalid, which is the caller's decision.
    pub fn validate_rule(&mut self, column: &ColumnDefinition, row: &Row) -> bool {
        let rule = &column.rule;
        let directives = rule.directives;
        let severity = directives.severity();
        self.ctx.column = column.name.clone();
        self.ctx.severity = severity;

        let value = match row.get(&self.directives.column_key(&column.name)) {
            Some(v) => v,
            None => {
                let message = format!(
                    "column {} is missing from line: {}",
                    column.name, self.ctx.row_index
                );
                self.ctx.push(severity, message);
                return false;
            }
        };

        // optional wins over every other directive
        if directives.optional && value.is_empty() {
            return true;
        }

        let fold = self.options.ignore_case || directives.ignore_case;
        let level = ReportLevel::from(severity);
        let mut valid = true;
        for check in &rule.exprs {
            if directives.match_is_false {
                if self.validate(&check.expr, value, row, ReportLevel::None, fold) {
                    let message = format!(
                        "{} should not have matched for line: {}, column: {}, value: \"{value}\"",
                        check.expr, self.ctx.row_index, column.name
                    );
                    self.ctx.push(severity, message);
                    valid = false;
                }
            } else if !self.validate(&check.expr, value, row, level, fold) {
                valid = false;
            }
        }
        trace!(column = %column.name, row = self.ctx.row_index, valid, "column validated");
        valid
    }

    // ══════════════════════════════════════════════════════════════════════
    // Reporting
    // ══════════════════════════════════════════════════════════════════════

    /// Record a failure at `level` and return `false`.
    fn fail(
        &mut self,
        level: ReportLevel,
        expr: &dyn Display,
        value: &str,
        detail: Option<&dyn Display>,
    ) -> bool {
        if let Some(severity) = level.severity() {
            let mut message = format!(
                "{expr} fails for line: {}, column: {}, value: \"{value}\"",
                self.ctx.row_index, self.ctx.column
            );
            if let Some(detail) = detail {
                message.push_str(&format!(" ({detail})"));
            }
            self.ctx.push(severity, message);
        }
        false
    }

    fn check(&mut self, ok: bool, level: ReportLevel, expr: &ValidatingExpr, value: &str) -> bool {
        ok || self.fail(level, expr, value, None)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Validating expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate `expr` against `value`, reporting a failure at `level`.
    pub fn validate(
        &mut self,
        expr: &ValidatingExpr,
        value: &str,
        row: &Row,
        level: ReportLevel,
        fold: bool,
    ) -> bool {
        match expr {
            // ── Comparisons ──
            ValidatingExpr::Is(d) | ValidatingExpr::Not(d) => match self.eval_data(d, row) {
                Ok(target) => {
                    let equal = text_eq(value, &target, fold);
                    if matches!(expr, ValidatingExpr::Is(_)) {
                        equal || self.fail(level, expr, value, Some(&format!("expected \"{target}\"")))
                    } else {
                        !equal || self.fail(level, expr, value, None)
                    }
                }
                Err(e) => self.fail(level, expr, value, Some(&e)),
            },
            ValidatingExpr::Any(candidates) => {
                let mut matched = false;
                for candidate in candidates {
                    match self.eval_data(candidate, row) {
                        Ok(target) if text_eq(value, &target, fold) => {
                            matched = true;
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => return self.fail(level, expr, value, Some(&e)),
                    }
                }
                self.check(matched, level, expr, value)
            }
            ValidatingExpr::In(d) | ValidatingExpr::StartsWith(d) | ValidatingExpr::EndsWith(d) => {
                match self.eval_data(d, row) {
                    Ok(target) => {
                        let haystack = folded(value, fold);
                        let needle = folded(&target, fold);
                        let ok = match expr {
                            ValidatingExpr::In(_) => haystack.contains(needle.as_ref()),
                            ValidatingExpr::StartsWith(_) => haystack.starts_with(needle.as_ref()),
                            _ => haystack.ends_with(needle.as_ref()),
                        };
                        self.check(ok, level, expr, value)
                    }
                    Err(e) => self.fail(level, expr, value, Some(&e)),
                }
            }
            ValidatingExpr::RegExp(pattern) => {
                let ok = pattern.is_full_match(value, fold);
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::Range(bounds) => {
                let ok = value
                    .trim()
                    .parse::<f64>()
                    .is_ok_and(|n| n.is_finite() && bounds.contains(&n));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::Length(spec) => {
                let ok = spec.accepts(value.chars().count());
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::Empty => self.check(value.is_empty(), level, expr, value),
            ValidatingExpr::NotEmpty => self.check(!value.is_empty(), level, expr, value),

            // ── Stateful ──
            ValidatingExpr::Unique { columns, slot } => {
                let mut key = Vec::with_capacity(columns.len().max(1));
                if columns.is_empty() {
                    key.push(folded(value, fold).into_owned());
                } else {
                    for c in columns {
                        match self.column_value(&c.name, row) {
                            Ok(v) => key.push(folded(v, fold).into_owned()),
                            Err(e) => return self.fail(level, expr, value, Some(&e)),
                        }
                    }
                }
                self.ctx.first_seen(*slot, key)
                    || self.fail(level, expr, value, Some(&"duplicate value"))
            }
            ValidatingExpr::Identical { slot } => {
                let current = folded(value, fold).into_owned();
                let memo = self.ctx.memo(*slot, &current);
                memo == current
                    || self.fail(level, expr, value, Some(&format!("expected \"{memo}\"")))
            }

            // ── Formats ──
            ValidatingExpr::Uri => self.check(url::Url::parse(value).is_ok(), level, expr, value),
            ValidatingExpr::XsdDateTime(b) => {
                let ok = temporal::parse_xsd_datetime(value).is_some_and(|v| b.contains(&v));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::XsdDateTimeWithTimezone(b) => {
                let ok = temporal::parse_xsd_datetime_tz(value).is_some_and(|v| b.contains(&v));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::XsdDate(b) => {
                let ok = temporal::parse_xsd_date(value).is_some_and(|v| b.contains(&v));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::XsdTime(b) => {
                let ok = temporal::parse_xsd_time(value).is_some_and(|v| b.contains(&v));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::UkDate(b) => {
                let ok = temporal::parse_uk_date(value).is_some_and(|v| b.contains(&v));
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::Date {
                year,
                month,
                day,
                range,
            } => match self.date_parts(year, month, day, row) {
                Ok((y, m, d)) => {
                    let ok = temporal::compose_date(&y, &m, &d).is_some_and(|v| range.contains(&v));
                    self.check(ok, level, expr, value)
                }
                Err(e) => self.fail(level, expr, value, Some(&e)),
            },
            ValidatingExpr::PartialUkDate => {
                self.check(temporal::is_partial_uk_date(value), level, expr, value)
            }
            ValidatingExpr::PartialDate { year, month, day } => {
                match self.date_parts(year, month, day, row) {
                    Ok((y, m, d)) => {
                        self.check(temporal::is_partial_date(&y, &m, &d), level, expr, value)
                    }
                    Err(e) => self.fail(level, expr, value, Some(&e)),
                }
            }
            ValidatingExpr::Uuid4 => self.check(is_uuid4(value, fold), level, expr, value),
            ValidatingExpr::PositiveInteger => {
                self.check(is_positive_integer(value), level, expr, value)
            }
            // case-sensitive even under @ignoreCase
            ValidatingExpr::Uppercase => {
                self.check(value.chars().all(char::is_uppercase), level, expr, value)
            }
            ValidatingExpr::Lowercase => {
                self.check(value.chars().all(char::is_lowercase), level, expr, value)
            }

            // ── Filesystem ──
            ValidatingExpr::FileExists { prefix } => {
                let text = match prefix {
                    Some(p) => match self.eval_data(p, row) {
                        Ok(p) => join_path(&p, value),
                        Err(e) => return self.fail(level, expr, value, Some(&e)),
                    },
                    None => value.to_string(),
                };
                let ok = self.locate(&text, fold).is_some();
                self.check(ok, level, expr, value)
            }
            ValidatingExpr::Checksum { file, algorithm } => {
                let text = match self.eval_data(file, row) {
                    Ok(t) => t,
                    Err(e) => return self.fail(level, expr, value, Some(&e)),
                };
                let Some(path) = self.locate(&text, fold) else {
                    return self.fail(level, expr, value, Some(&format!("file {text} not found")));
                };
                match self.ctx.probes.digest(self.fs, &path, *algorithm) {
                    Some(digest) => {
                        let ok = if fold {
                            digest.eq_ignore_ascii_case(value.trim())
                        } else {
                            digest == value.trim()
                        };
                        ok || self.fail(level, expr, value, Some(&format!("{algorithm} is {digest}")))
                    }
                    None => self.fail(level, expr, value, Some(&format!("cannot read {text}"))),
                }
            }
            ValidatingExpr::FileCount { file } => {
                let text = match self.eval_data(file, row) {
                    Ok(t) => t,
                    Err(e) => return self.fail(level, expr, value, Some(&e)),
                };
                let listing = self
                    .locate(&text, fold)
                    .and_then(|dir| self.ctx.probes.list_dir(self.fs, &dir));
                match listing {
                    Some(entries) => {
                        let ok = value.trim().parse::<usize>() == Ok(entries.len());
                        ok || self.fail(
                            level,
                            expr,
                            value,
                            Some(&format!("{text} holds {} entries", entries.len())),
                        )
                    }
                    None => self.fail(level, expr, value, Some(&format!("cannot list {text}"))),
                }
            }
            ValidatingExpr::IntegrityCheck {
                prefix,
                subfolder,
                folders,
                slot,
            } => self.integrity_check(expr, value, row, level, fold, prefix, subfolder, *folders, *slot),

            // ── Combinators ──
            ValidatingExpr::Or(exprs) => {
                let any = exprs
                    .iter()
                    .any(|e| self.validate(e, value, row, ReportLevel::None, fold));
                self.check(any, level, expr, value)
            }
            ValidatingExpr::And(exprs) => exprs
                .iter()
                .all(|e| self.validate(e, value, row, level, fold)),
            ValidatingExpr::Parenthesized(exprs) => exprs
                .iter()
                .all(|e| self.validate(&e.expr, value, row, level, fold)),
            ValidatingExpr::If {
                condition,
                then,
                otherwise,
            } => {
                let holds = self.validate(condition, value, row, ReportLevel::None, fold);
                let clause = if holds { Some(then) } else { otherwise.as_ref() };
                self.validate_clause(clause, value, row, level, fold)
            }
            ValidatingExpr::Switch { cases, otherwise } => {
                let mut chosen = otherwise.as_ref();
                for case in cases {
                    if self.validate(&case.condition, value, row, ReportLevel::None, fold) {
                        chosen = Some(&case.clause);
                        break;
                    }
                }
                self.validate_clause(chosen, value, row, level, fold)
            }
            ValidatingExpr::Single { expr: inner, column } => match column {
                None => self.validate(inner, value, row, level, fold),
                Some(c) => match self.column_value(&c.name, row) {
                    Ok(other) => self.validate(inner, other, row, level, fold),
                    Err(e) => self.fail(level, expr, value, Some(&e)),
                },
            },
        }
    }

    /// Every expression of the clause must hold; no clause means vacuous truth.
    fn validate_clause(
        &mut self,
        clause: Option<&IfClause>,
        value: &str,
        row: &Row,
        level: ReportLevel,
        fold: bool,
    ) -> bool {
        clause.map_or(true, |c| {
            c.exprs
                .iter()
                .all(|e| self.validate(&e.expr, value, row, level, fold))
        })
    }

    fn date_parts(
        &mut self,
        year: &DataExpr,
        month: &DataExpr,
        day: &DataExpr,
        row: &Row,
    ) -> Result<(String, String, String), crate::error::DataError> {
        Ok((
            self.eval_data(year, row)?,
            self.eval_data(month, row)?,
            self.eval_data(day, row)?,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Filesystem helpers
    // ══════════════════════════════════════════════════════════════════════

    /// Resolve path text to an existing path, case-insensitively when folding.
    fn locate(&mut self, text: &str, fold: bool) -> Option<PathBuf> {
        let path = self.options.resolve(&to_path(text));
        if self.ctx.probes.exists(self.fs, &path) {
            return Some(path);
        }
        if fold {
            return self.ctx.probes.resolve_caseless(self.fs, &path);
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn integrity_check(
        &mut self,
        expr: &ValidatingExpr,
        value: &str,
        row: &Row,
        level: ReportLevel,
        fold: bool,
        prefix: &Option<DataExpr>,
        subfolder: &Option<DataExpr>,
        folders: FolderSpec,
        slot: StateSlot,
    ) -> bool {
        let prefix = match prefix {
            Some(p) => match self.eval_data(p, row) {
                Ok(p) => p,
                Err(e) => return self.fail(level, expr, value, Some(&e)),
            },
            None => String::new(),
        };
        let subfolder = match subfolder {
            Some(s) => match self.eval_data(s, row) {
                Ok(s) => s,
                Err(e) => return self.fail(level, expr, value, Some(&e)),
            },
            None => "content".to_string(),
        };
        let root_text = join_path(&prefix, &subfolder);
        let root = match self.locate(&root_text, fold) {
            Some(root) => root,
            None => {
                return self.fail(level, expr, value, Some(&format!("folder {root_text} not found")))
            }
        };

        // the root is checked at the end of the run even if no row resolves
        let severity = self.ctx.severity;
        self.ctx
            .record_reference(slot, folders, severity, &root, None);

        let trimmed = value.trim_start_matches("./");
        let referenced = to_path(trimmed);
        if trimmed.is_empty()
            || referenced
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return self.fail(
                level,
                expr,
                value,
                Some(&format!("not a path below {}", root.display())),
            );
        }
        let target = if referenced.is_absolute() {
            referenced
        } else {
            root.join(referenced)
        };
        let Some(found) = self.locate(&target.to_string_lossy(), fold) else {
            return self.fail(level, expr, value, Some(&"file not found"));
        };
        let relative = match found.strip_prefix(&root) {
            Ok(r) if !r.as_os_str().is_empty() => r.to_path_buf(),
            _ => {
                return self.fail(
                    level,
                    expr,
                    value,
                    Some(&format!("outside of {}", root.display())),
                )
            }
        };
        if folders != FolderSpec::IncludeFolder && self.fs.is_dir(&found) {
            return self.fail(level, expr, value, Some(&"is a folder"));
        }
        self.ctx
            .record_reference(slot, folders, severity, &root, Some(&relative));
        true
    }

    /// End-of-run pass for `integrityCheck`: every entry under a checked
    /// folder must have been referenced by some row.
    ///
    /// Messages land on the last row. Returns `false` if any unreferenced
    /// entry was reported at error severity.
    pub fn finish(&mut self) -> bool {
        let mut valid = true;
        for memory in self.ctx.take_integrity() {
            self.ctx.column = memory.column.clone();
            let include_dirs = memory.folders == FolderSpec::IncludeFolder;
            for (root, referenced) in &memory.roots {
                for entry in self.walk(root, include_dirs) {
                    if referenced.contains(&entry) {
                        continue;
                    }
                    let message = format!(
                        "integrityCheck fails for column: {}, {} under {} is not referenced",
                        memory.column,
                        entry.display(),
                        root.display()
                    );
                    self.ctx.push(memory.severity, message);
                    if memory.severity == Severity::Error {
                        valid = false;
                    }
                }
            }
        }
        valid
    }

    /// Entries below `root`, relative to it, depth first.
    fn walk(&mut self, root: &Path, include_dirs: bool) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![PathBuf::new()];
        while let Some(relative) = pending.pop() {
            let dir = root.join(&relative);
            let Some(names) = self.ctx.probes.list_dir(self.fs, &dir) else {
                continue;
            };
            for name in names {
                let entry = relative.join(&name);
                if self.fs.is_dir(&root.join(&entry)) {
                    if include_dirs {
                        found.push(entry.clone());
                    }
                    pending.push(entry);
                } else {
                    found.push(entry);
                }
            }
        }
        found.sort();
        found
    }
}
