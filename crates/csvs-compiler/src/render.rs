//! Canonical schema text.
//!
//! Renders a compiled [`Schema`] back to CSV Schema syntax: one directive per
//! line in the prolog, one column rule per line in the body. The rendering
//! is a pure function of the model, so it doubles as the input of the schema
//! fingerprint.

use std::fmt::Write;

use csvs_types::ast::{ColumnDefinition, ColumnDirectives, GlobalDirectives, Schema};

pub fn render(schema: &Schema) -> String {
    let mut out = format!("version {}\n", schema.prolog.version);
    render_global(&mut out, schema.directives());
    for column in schema.columns() {
        render_column(&mut out, column);
    }
    out
}

fn render_global(out: &mut String, d: &GlobalDirectives) {
    if d.separator != ',' {
        if d.separator == '\t' {
            out.push_str("@separator TAB\n");
        } else {
            let _ = writeln!(out, "@separator '{}'", d.separator);
        }
    }
    if d.quoted {
        out.push_str("@quoted\n");
    }
    if let Some(n) = d.total_columns {
        let _ = writeln!(out, "@totalColumns {n}");
    }
    if d.permit_empty {
        out.push_str("@permitEmpty\n");
    }
    if d.no_header {
        out.push_str("@noHeader\n");
    }
    if d.ignore_column_name_case {
        out.push_str("@ignoreColumnNameCase\n");
    }
}

fn render_column(out: &mut String, column: &ColumnDefinition) {
    if column.name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
        out.push_str(&column.name);
    } else {
        let _ = write!(out, "\"{}\"", column.name);
    }
    out.push(':');
    for expr in &column.rule.exprs {
        let _ = write!(out, " {expr}");
    }
    render_column_directives(out, &column.rule.directives);
    out.push('\n');
}

fn render_column_directives(out: &mut String, d: &ColumnDirectives) {
    for (set, keyword) in [
        (d.optional, "@optional"),
        (d.match_is_false, "@matchIsFalse"),
        (d.ignore_case, "@ignoreCase"),
        (d.warning, "@warning"),
    ] {
        if set {
            out.push(' ');
            out.push_str(keyword);
        }
    }
}
