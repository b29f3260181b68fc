//! Schema root, prolog, version and global directives.

use std::collections::HashSet;

use csvs_types::ast::{Body, GlobalDirectives, Prolog, Schema};
use csvs_types::vocab::{DirectiveSpec, GlobalKey, GLOBAL_DIRECTIVES};
use csvs_types::{ErrorCode, Result, SchemaError, Version};
use tracing::debug;

use crate::builder::{unquote, Builder, Children, Reduced};

/// One reduced global directive with its parsed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GlobalSetting {
    Separator(char),
    Quoted,
    TotalColumns(usize),
    PermitEmpty,
    NoHeader,
    IgnoreColumnNameCase,
}

impl GlobalSetting {
    fn key(self) -> GlobalKey {
        match self {
            Self::Separator(_) => GlobalKey::Separator,
            Self::Quoted => GlobalKey::Quoted,
            Self::TotalColumns(_) => GlobalKey::TotalColumns,
            Self::PermitEmpty => GlobalKey::PermitEmpty,
            Self::NoHeader => GlobalKey::NoHeader,
            Self::IgnoreColumnNameCase => GlobalKey::IgnoreColumnNameCase,
        }
    }
}

fn keyword(key: GlobalKey) -> &'static str {
    GLOBAL_DIRECTIVES
        .iter()
        .find(|d| d.key == key)
        .map_or("directive", |d| d.keyword)
}

/// `TAB` or a single quoted ASCII character.
fn parse_separator(c: &Children<'_>, raw: &str) -> Result<char> {
    let text = raw.trim();
    if text == "TAB" || text == "\\t" {
        return Ok('\t');
    }
    let inner = unquote(text);
    if inner == "\\t" {
        return Ok('\t');
    }
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii() && ch != '\n' && ch != '\r' => Ok(ch),
        _ => Err(c
            .error(
                ErrorCode::INVALID_DIRECTIVE_VALUE,
                format!("@separator expects TAB or a single ASCII character, got {text}"),
            )
            .with_suggestion("write @separator ';' or @separator TAB")),
    }
}

impl Builder {
    // ══════════════════════════════════════════════════════════════════════════
    // Schema
    // ══════════════════════════════════════════════════════════════════════════

    /// `schema := prolog body`
    pub(crate) fn reduce_schema(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[2])?;
        let prolog = match c.take_if(|r| matches!(r, Reduced::Prolog(_))) {
            Some(Reduced::Prolog(p)) => p,
            _ => return Err(c.expected("prolog")),
        };
        let body = match c.take_if(|r| matches!(r, Reduced::Body(_))) {
            Some(Reduced::Body(b)) => b,
            _ => return Err(c.expected("body")),
        };
        c.finish()?;
        check_column_names(&prolog.global_directives, &body)?;
        Ok(Reduced::Schema(Schema { prolog, body }))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Prolog
    // ══════════════════════════════════════════════════════════════════════════

    /// `prolog := version [global_directives]`
    pub(crate) fn reduce_prolog(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let raw = match c.peek() {
            Some(Reduced::Text(_)) => c.text()?,
            _ => {
                return Err(c
                    .error(ErrorCode::MISSING_VERSION, "schema does not declare a version")
                    .with_suggestion("start the schema with `version 1.2`"))
            }
        };
        let version_text = unquote(raw.trim().trim_start_matches("version").trim());
        let version: Version = version_text
            .parse()
            .map_err(|msg: String| c.error(ErrorCode::UNSUPPORTED_VERSION, msg))?;

        let global_directives = match c.take_if(|r| matches!(r, Reduced::GlobalDirectives(_))) {
            Some(Reduced::GlobalDirectives(d)) => d,
            _ => GlobalDirectives::default(),
        };
        c.finish()?;
        debug!(%version, "prolog reduced");
        Ok(Reduced::Prolog(Prolog {
            version,
            global_directives,
        }))
    }

    pub(crate) fn reduce_global_directive(
        &mut self,
        spec: &DirectiveSpec<GlobalKey>,
        mut c: Children<'_>,
    ) -> Result<Reduced> {
        if !spec.takes_value {
            c.expect_count(&[0])?;
        } else {
            c.expect_count(&[1])?;
        }
        let setting = match spec.key {
            GlobalKey::Separator => {
                let raw = c.text()?;
                GlobalSetting::Separator(parse_separator(&c, &raw)?)
            }
            GlobalKey::TotalColumns => {
                let raw = c.text()?;
                match unquote(&raw).parse::<usize>() {
                    Ok(n) if n > 0 => GlobalSetting::TotalColumns(n),
                    _ => {
                        return Err(c.error(
                            ErrorCode::INVALID_DIRECTIVE_VALUE,
                            format!("{} expects a positive integer, got {raw}", spec.keyword),
                        ))
                    }
                }
            }
            GlobalKey::Quoted => GlobalSetting::Quoted,
            GlobalKey::PermitEmpty => GlobalSetting::PermitEmpty,
            GlobalKey::NoHeader => GlobalSetting::NoHeader,
            GlobalKey::IgnoreColumnNameCase => GlobalSetting::IgnoreColumnNameCase,
        };
        c.finish()?;
        Ok(Reduced::GlobalSetting(setting))
    }

    /// Fold the directive list over the defaults.
    pub(crate) fn reduce_global_directives(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        let mut directives = GlobalDirectives::default();
        let mut seen = HashSet::new();
        while let Some(item) = c.take_if(|_| true) {
            let setting = match item {
                Reduced::GlobalSetting(s) => s,
                other => {
                    return Err(c.error(
                        ErrorCode::UNEXPECTED_CHILD,
                        format!("expected global directive, found {}", other.kind()),
                    ))
                }
            };
            if !seen.insert(setting.key()) {
                return Err(c.error(
                    ErrorCode::DUPLICATE_DIRECTIVE,
                    format!("{} is declared more than once", keyword(setting.key())),
                ));
            }
            match setting {
                GlobalSetting::Separator(ch) => directives.separator = ch,
                GlobalSetting::Quoted => directives.quoted = true,
                GlobalSetting::TotalColumns(n) => directives.total_columns = Some(n),
                GlobalSetting::PermitEmpty => directives.permit_empty = true,
                GlobalSetting::NoHeader => directives.no_header = true,
                GlobalSetting::IgnoreColumnNameCase => directives.ignore_column_name_case = true,
            }
        }
        if directives.no_header && directives.ignore_column_name_case {
            return Err(c
                .error(
                    ErrorCode::CONFLICTING_DIRECTIVES,
                    "@noHeader cannot be combined with @ignoreColumnNameCase",
                )
                .with_suggestion("remove @ignoreColumnNameCase: without a header there are no names to compare"));
        }
        Ok(Reduced::GlobalDirectives(directives))
    }
}

/// Column names must be unique after case folding.
fn check_column_names(directives: &GlobalDirectives, body: &Body) -> Result<()> {
    let mut seen = HashSet::new();
    for column in &body.columns {
        if !seen.insert(directives.column_key(&column.name)) {
            return Err(SchemaError::new(
                ErrorCode::DUPLICATE_COLUMN,
                format!("column '{}' is defined more than once", column.name),
            )
            .at_node("column_definition", None));
        }
    }
    Ok(())
}
