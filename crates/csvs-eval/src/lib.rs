//! CSV Schema expression engine and validation runtime.
//!
//! Takes a compiled [`Schema`](csvs_types::ast::Schema) and checks CSV
//! records against it, producing a structured [`Report`]. The schema is never
//! mutated: stateful rules keep their memory in a per-run [`RunContext`].
//!
//! ```ignore
//! let outcome = Validator::new(&schema).validate_path("data.csv")?;
//! for entry in outcome.report.messages() {
//!     println!("{:?} {}", entry.row, entry.message);
//! }
//! ```

pub mod checksum;
pub mod context;
mod data;
pub mod error;
pub mod evaluator;
pub mod fs;
pub mod options;
pub mod report;
pub mod row;
pub mod validator;

pub use context::RunContext;
pub use error::{DataError, EvalError, EvalResult};
pub use evaluator::{Evaluator, ReportLevel};
pub use fs::{Filesystem, MemoryFilesystem, OsFilesystem};
pub use options::ValidationOptions;
pub use report::{FileMessage, Report, ReportEntry};
pub use row::Row;
pub use validator::{ValidationOutcome, Validator};
