//! CSV Schema tree builder: reduces the generic parse tree produced by an
//! external grammar into the typed [`Schema`] model.
//!
//! ```ignore
//! let schema = csvs_builder::build(&tree)?;
//! ```

mod build_body;
mod build_data;
mod build_expr;
mod build_prolog;
mod builder;

pub use builder::{Builder, MAX_DEPTH};

use csvs_types::ast::Schema;
use csvs_types::{ParseNode, Result};

/// Build a schema from a parse tree rooted at `start` or `schema`.
pub fn build(tree: &ParseNode) -> Result<Schema> {
    Builder::new().build(tree)
}
