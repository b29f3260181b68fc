//! Data expression reducers: literals, column references, string
//! transformations and file paths.

use csvs_types::ast::{ColumnRef, DataExpr, StringProvider};
use csvs_types::{ErrorCode, Result};

use crate::builder::{column_name, unquote, Builder, Children, Reduced};

fn data(expr: DataExpr) -> Result<Reduced> {
    Ok(Reduced::Data(expr))
}

impl Builder {
    /// A quoted literal, or a nested data expression providing the string.
    pub(crate) fn reduce_string_provider(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let provider = match c.peek() {
            Some(Reduced::Text(_)) => StringProvider::Literal(unquote(&c.text()?)),
            _ => match c.data()? {
                literal @ DataExpr::StringProvider(StringProvider::Literal(_)) => {
                    return data(literal)
                }
                inner => StringProvider::Expr(Box::new(inner)),
            },
        };
        c.finish()?;
        data(DataExpr::StringProvider(provider))
    }

    pub(crate) fn reduce_column_ref(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let name = column_name(&c.text()?);
        if name.is_empty() {
            return Err(c.error(ErrorCode::MALFORMED_TREE, "column reference has no name"));
        }
        c.finish()?;
        data(DataExpr::ColumnRef(ColumnRef::new(name)))
    }

    pub(crate) fn reduce_concat(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_at_least(1)?;
        let parts = c.rest(Children::data)?;
        data(DataExpr::Concat(parts))
    }

    pub(crate) fn reduce_no_ext(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1])?;
        let inner = Box::new(c.data()?);
        c.finish()?;
        data(DataExpr::NoExt(inner))
    }

    /// `uriDecode(value [, encoding])`
    pub(crate) fn reduce_uri_decode(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1, 2])?;
        let value = Box::new(c.data()?);
        let encoding = if c.is_empty() {
            None
        } else {
            Some(Box::new(c.data()?))
        };
        c.finish()?;
        data(DataExpr::UriDecode { value, encoding })
    }

    /// `file([prefix,] file)`
    pub(crate) fn reduce_file(&mut self, mut c: Children<'_>) -> Result<Reduced> {
        c.expect_count(&[1, 2])?;
        let prefix = if c.len() == 2 {
            Some(Box::new(c.data()?))
        } else {
            None
        };
        let file = Box::new(c.data()?);
        c.finish()?;
        data(DataExpr::File { prefix, file })
    }
}
