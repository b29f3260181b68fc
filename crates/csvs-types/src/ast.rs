//! Schema model: the compiled form of a CSV Schema document.
//!
//! Pure data. Every expression family is a closed enum so evaluators match
//! exhaustively. Stateful expressions (`unique`, `identical`,
//! `integrityCheck`) carry only a [`StateSlot`]; their memory belongs to a
//! validation run, never to the schema.

use crate::vocab::{FolderSpec, HashAlgorithm, Version};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Regex, RegexBuilder};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A compiled schema: prolog + ordered column definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub prolog: Prolog,
    pub body: Body,
}

impl Schema {
    pub fn directives(&self) -> &GlobalDirectives {
        &self.prolog.global_directives
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.body.columns
    }

    /// Number of run-scoped memory slots the schema's expressions use.
    pub fn state_slots(&self) -> usize {
        self.body.state_slots
    }
}

/// `version 1.1` followed by the global directives.
#[derive(Debug, Clone, PartialEq)]
pub struct Prolog {
    pub version: Version,
    pub global_directives: GlobalDirectives,
}

/// Schema-wide directives with their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDirectives {
    pub separator: char,
    pub quoted: bool,
    pub total_columns: Option<usize>,
    pub permit_empty: bool,
    pub no_header: bool,
    pub ignore_column_name_case: bool,
}

impl Default for GlobalDirectives {
    fn default() -> Self {
        Self {
            separator: ',',
            quoted: false,
            total_columns: None,
            permit_empty: false,
            no_header: false,
            ignore_column_name_case: false,
        }
    }
}

impl GlobalDirectives {
    /// Normalize a column name the way the row mapping keys are normalized.
    pub fn column_key(&self, name: &str) -> String {
        if self.ignore_column_name_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }
}

/// Column definitions in CSV column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub columns: Vec<ColumnDefinition>,
    pub state_slots: usize,
}

/// `name: rule`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub rule: ColumnRule,
}

/// The ordered checks attached to one column, plus its directives.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRule {
    pub exprs: Vec<ColumnValidationExpr>,
    pub directives: ColumnDirectives,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnDirectives {
    pub optional: bool,
    pub match_is_false: bool,
    pub ignore_case: bool,
    pub warning: bool,
}

impl ColumnDirectives {
    pub fn severity(&self) -> crate::Severity {
        if self.warning {
            crate::Severity::Warning
        } else {
            crate::Severity::Error
        }
    }
}

/// Uniform wrapper for every entry of a rule or clause list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValidationExpr {
    pub expr: ValidatingExpr,
}

impl ColumnValidationExpr {
    pub fn new(expr: ValidatingExpr) -> Self {
        Self { expr }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Supporting types
// ══════════════════════════════════════════════════════════════════════════════

/// Identity of a stateful expression's run-scoped memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateSlot(pub usize);

/// Inclusive bounds; `None` on a side means unbounded (`*`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(start: Option<T>, end: Option<T>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.start.as_ref().map_or(true, |s| s <= value)
            && self.end.as_ref().map_or(true, |e| value <= e)
    }
}

/// `length(n)` or `length(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthSpec {
    Exact(usize),
    Between(Bounds<usize>),
}

impl LengthSpec {
    pub fn accepts(&self, len: usize) -> bool {
        match self {
            Self::Exact(n) => len == *n,
            Self::Between(bounds) => bounds.contains(&len),
        }
    }
}

/// A `regex(...)` pattern, compiled once for exact and case-folded matching.
///
/// Both variants are anchored so a match always covers the whole value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    exact: Regex,
    folded: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let anchored = format!("^(?:{source})$");
        Ok(Self {
            source: source.to_string(),
            exact: Regex::new(&anchored)?,
            folded: RegexBuilder::new(&anchored).case_insensitive(true).build()?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, value: &str, ignore_case: bool) -> bool {
        if ignore_case {
            self.folded.is_match(value)
        } else {
            self.exact.is_match(value)
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Checks applied when an `if` condition holds (or fails, for the else clause).
#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub exprs: Vec<ColumnValidationExpr>,
}

/// One `(condition, clause)` arm of a `switch`.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub condition: Box<ValidatingExpr>,
    pub clause: IfClause,
}

// ══════════════════════════════════════════════════════════════════════════════
// Validating expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A boolean predicate over a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatingExpr {
    // ── Comparisons ──
    Is(DataExpr),
    Any(Vec<DataExpr>),
    Not(DataExpr),
    In(DataExpr),
    StartsWith(DataExpr),
    EndsWith(DataExpr),
    RegExp(Pattern),
    Range(Bounds<f64>),
    Length(LengthSpec),
    Empty,
    NotEmpty,

    // ── Stateful ──
    Unique {
        columns: Vec<ColumnRef>,
        slot: StateSlot,
    },
    Identical {
        slot: StateSlot,
    },

    // ── Formats ──
    Uri,
    XsdDateTime(Bounds<NaiveDateTime>),
    XsdDateTimeWithTimezone(Bounds<NaiveDateTime>),
    XsdDate(Bounds<NaiveDate>),
    XsdTime(Bounds<NaiveTime>),
    UkDate(Bounds<NaiveDate>),
    Date {
        year: DataExpr,
        month: DataExpr,
        day: DataExpr,
        range: Bounds<NaiveDate>,
    },
    PartialUkDate,
    PartialDate {
        year: DataExpr,
        month: DataExpr,
        day: DataExpr,
    },
    Uuid4,
    PositiveInteger,
    Uppercase,
    Lowercase,

    // ── Filesystem ──
    FileExists {
        prefix: Option<DataExpr>,
    },
    IntegrityCheck {
        prefix: Option<DataExpr>,
        subfolder: Option<DataExpr>,
        folders: FolderSpec,
        slot: StateSlot,
    },
    Checksum {
        file: DataExpr,
        algorithm: HashAlgorithm,
    },
    FileCount {
        file: DataExpr,
    },

    // ── Combinators ──
    Or(Vec<ValidatingExpr>),
    And(Vec<ValidatingExpr>),
    If {
        condition: Box<ValidatingExpr>,
        then: IfClause,
        otherwise: Option<IfClause>,
    },
    Switch {
        cases: Vec<SwitchCase>,
        otherwise: Option<IfClause>,
    },
    Parenthesized(Vec<ColumnValidationExpr>),
    /// An expression, optionally applied to another column's value.
    Single {
        expr: Box<ValidatingExpr>,
        column: Option<ColumnRef>,
    },
}

// ══════════════════════════════════════════════════════════════════════════════
// Data expressions
// ══════════════════════════════════════════════════════════════════════════════

/// `$column`: refers to another column of the current row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StringProvider {
    Literal(String),
    Expr(Box<DataExpr>),
}

/// A string-producing expression used as an operand or path component.
#[derive(Debug, Clone, PartialEq)]
pub enum DataExpr {
    ColumnRef(ColumnRef),
    StringProvider(StringProvider),
    Concat(Vec<DataExpr>),
    NoExt(Box<DataExpr>),
    UriDecode {
        value: Box<DataExpr>,
        encoding: Option<Box<DataExpr>>,
    },
    File {
        prefix: Option<Box<DataExpr>>,
        file: Box<DataExpr>,
    },
}

impl DataExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::StringProvider(StringProvider::Literal(text.into()))
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::ColumnRef(ColumnRef::new(name))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Rendering (schema syntax, used in report messages)
// ══════════════════════════════════════════════════════════════════════════════

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn bound<T: fmt::Display>(b: &Option<T>) -> String {
    b.as_ref().map_or_else(|| "*".to_string(), T::to_string)
}

fn ranged<T: fmt::Display + PartialOrd>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    bounds: &Bounds<T>,
) -> fmt::Result {
    if bounds.is_unbounded() {
        f.write_str(name)
    } else {
        write!(f, "{name}({}, {})", bound(&bounds.start), bound(&bounds.end))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

impl fmt::Display for DataExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnRef(c) => write!(f, "{c}"),
            Self::StringProvider(StringProvider::Literal(s)) => write!(f, "\"{s}\""),
            Self::StringProvider(StringProvider::Expr(e)) => write!(f, "{e}"),
            Self::Concat(parts) => {
                f.write_str("concat(")?;
                join(f, parts, ", ")?;
                f.write_str(")")
            }
            Self::NoExt(e) => write!(f, "noExt({e})"),
            Self::UriDecode { value, encoding } => match encoding {
                Some(enc) => write!(f, "uriDecode({value}, {enc})"),
                None => write!(f, "uriDecode({value})"),
            },
            Self::File { prefix, file } => match prefix {
                Some(p) => write!(f, "file({p}, {file})"),
                None => write!(f, "file({file})"),
            },
        }
    }
}

impl fmt::Display for ColumnValidationExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl fmt::Display for IfClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        join(f, &self.exprs, " ")
    }
}

impl fmt::Display for ValidatingExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Is(d) => write!(f, "is({d})"),
            Self::Any(ds) => {
                f.write_str("any(")?;
                join(f, ds, ", ")?;
                f.write_str(")")
            }
            Self::Not(d) => write!(f, "not({d})"),
            Self::In(d) => write!(f, "in({d})"),
            Self::StartsWith(d) => write!(f, "starts({d})"),
            Self::EndsWith(d) => write!(f, "ends({d})"),
            Self::RegExp(p) => write!(f, "regex(\"{}\")", p.as_str()),
            Self::Range(b) => write!(f, "range({}, {})", bound(&b.start), bound(&b.end)),
            Self::Length(LengthSpec::Exact(n)) => write!(f, "length({n})"),
            Self::Length(LengthSpec::Between(b)) => {
                write!(f, "length({}, {})", bound(&b.start), bound(&b.end))
            }
            Self::Empty => f.write_str("empty"),
            Self::NotEmpty => f.write_str("notEmpty"),
            Self::Unique { columns, .. } if columns.is_empty() => f.write_str("unique"),
            Self::Unique { columns, .. } => {
                f.write_str("unique(")?;
                join(f, columns, ", ")?;
                f.write_str(")")
            }
            Self::Identical { .. } => f.write_str("identical"),
            Self::Uri => f.write_str("uri"),
            Self::XsdDateTime(b) => ranged(f, "xDateTime", b),
            Self::XsdDateTimeWithTimezone(b) => ranged(f, "xDateTimeTz", b),
            Self::XsdDate(b) => ranged(f, "xDate", b),
            Self::XsdTime(b) => ranged(f, "xTime", b),
            Self::UkDate(b) => ranged(f, "ukDate", b),
            Self::Date {
                year,
                month,
                day,
                range,
            } => {
                if range.is_unbounded() {
                    write!(f, "date({year}, {month}, {day})")
                } else {
                    write!(
                        f,
                        "date({year}, {month}, {day}, {}, {})",
                        bound(&range.start),
                        bound(&range.end)
                    )
                }
            }
            Self::PartialUkDate => f.write_str("partUkDate"),
            Self::PartialDate { year, month, day } => {
                write!(f, "partDate({year}, {month}, {day})")
            }
            Self::Uuid4 => f.write_str("uuid4"),
            Self::PositiveInteger => f.write_str("positiveInteger"),
            Self::Uppercase => f.write_str("upperCase"),
            Self::Lowercase => f.write_str("lowerCase"),
            Self::FileExists { prefix: None } => f.write_str("fileExists"),
            Self::FileExists { prefix: Some(p) } => write!(f, "fileExists({p})"),
            Self::IntegrityCheck {
                prefix,
                subfolder,
                folders,
                ..
            } => {
                f.write_str("integrityCheck(")?;
                if let Some(p) = prefix {
                    write!(f, "{p}, ")?;
                }
                if let Some(s) = subfolder {
                    write!(f, "{s}, ")?;
                }
                write!(f, "\"{folders}\")")
            }
            Self::Checksum { file, algorithm } => write!(f, "checksum({file}, \"{algorithm}\")"),
            Self::FileCount { file } => write!(f, "fileCount({file})"),
            Self::Or(exprs) => join(f, exprs, " or "),
            Self::And(exprs) => join(f, exprs, " and "),
            Self::If {
                condition,
                then,
                otherwise,
            } => match otherwise {
                Some(o) => write!(f, "if({condition}, {then}, {o})"),
                None => write!(f, "if({condition}, {then})"),
            },
            Self::Switch { cases, otherwise } => {
                f.write_str("switch(")?;
                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({}, {})", case.condition, case.clause)?;
                }
                if let Some(o) = otherwise {
                    write!(f, ", {o}")?;
                }
                f.write_str(")")
            }
            Self::Parenthesized(exprs) => {
                f.write_str("(")?;
                join(f, exprs, " ")?;
                f.write_str(")")
            }
            Self::Single {
                expr,
                column: Some(c),
            } => write!(f, "{c}/{expr}"),
            Self::Single { expr, column: None } => write!(f, "{expr}"),
        }
    }
}
