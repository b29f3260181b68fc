//! Validation runtime: drives a compiled schema over CSV records.
//!
//! A [`Validator`] borrows an immutable [`Schema`]; every run builds its own
//! [`Evaluator`] and run context, so one schema validates any number of files
//! without state from one run leaking into the next.

use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use csvs_types::ast::Schema;
use csvs_types::Severity;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::fs::{Filesystem, OsFilesystem};
use crate::options::ValidationOptions;
use crate::report::Report;
use crate::row::Row;

static OS_FS: OsFilesystem = OsFilesystem;

/// The result of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// `false` if any error-severity rule failed anywhere in the file.
    pub valid: bool,
    pub report: Report,
    /// Number of data records read.
    pub rows: u64,
}

/// Validates CSV input against one schema.
pub struct Validator<'s> {
    schema: &'s Schema,
    options: ValidationOptions,
    fs: &'s dyn Filesystem,
}

impl<'s> Validator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            options: ValidationOptions::default(),
            fs: &OS_FS,
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Point the filesystem rules at something other than the host disk.
    pub fn with_filesystem(mut self, fs: &'s dyn Filesystem) -> Self {
        self.fs = fs;
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    // ══════════════════════════════════════════════════════════════════════
    // Entry points
    // ══════════════════════════════════════════════════════════════════════

    pub fn validate_str(&self, csv: &str) -> EvalResult<ValidationOutcome> {
        self.validate_reader(csv.as_bytes())
    }

    pub fn validate_path(&self, path: impl AsRef<Path>) -> EvalResult<ValidationOutcome> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "validating file");
        self.validate_reader(io::BufReader::new(file))
    }

    /// Parse `reader` with the schema's separator and quoting, then validate.
    pub fn validate_reader<R: io::Read>(&self, reader: R) -> EvalResult<ValidationOutcome> {
        let directives = self.schema.directives();
        let mut reader = ReaderBuilder::new()
            .delimiter(directives.separator as u8)
            .has_headers(false)
            .flexible(true)
            .quoting(directives.quoted)
            .from_reader(reader);

        let mut records = reader.records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .map_err(EvalError::from)
        });

        let header = if directives.no_header {
            None
        } else {
            match records.next() {
                Some(header) => Some(header?),
                None => return Err(EvalError::MissingHeader),
            }
        };
        self.run(header, records)
    }

    /// Validate records that were already split into fields.
    ///
    /// `header` must be `Some` unless the schema declares `@noHeader`.
    pub fn validate_records<I>(
        &self,
        header: Option<Vec<String>>,
        rows: I,
    ) -> EvalResult<ValidationOutcome>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let header = match (header, self.schema.directives().no_header) {
            (_, true) => None,
            (Some(h), false) => Some(h),
            (None, false) => return Err(EvalError::MissingHeader),
        };
        self.run(header, rows.into_iter().map(Ok))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Run
    // ══════════════════════════════════════════════════════════════════════

    fn run<I>(&self, header: Option<Vec<String>>, records: I) -> EvalResult<ValidationOutcome>
    where
        I: Iterator<Item = EvalResult<Vec<String>>>,
    {
        let directives = self.schema.directives();
        let columns = self.schema.columns();
        let keys: Vec<String> = columns
            .iter()
            .map(|c| directives.column_key(&c.name))
            .collect();
        let mut records = records.peekable();

        match &header {
            Some(header) => self.check_header(header)?,
            None => {
                if let Some(Ok(first)) = records.peek() {
                    self.check_count(first.len())?;
                }
            }
        }

        info!(
            columns = columns.len(),
            no_header = directives.no_header,
            "validation run started"
        );

        let mut eval = Evaluator::new(self.schema, &self.options, self.fs);
        eval.ctx.row_index = if directives.no_header { 0 } else { 1 };
        let mut valid = true;
        let mut rows = 0u64;

        for record in records {
            let record = record?;
            eval.ctx.row_index += 1;
            rows += 1;
            let row = Row::from_fields(&keys, record);
            let mut row_valid = true;
            for column in columns {
                let ok = eval.validate_rule(column, &row);
                row_valid &= ok || column.rule.directives.severity() == Severity::Warning;
            }
            if !row_valid {
                debug!(row = eval.ctx.row_index, "row invalid");
            }
            valid &= row_valid;
        }

        if rows == 0 && !directives.permit_empty {
            eval.ctx
                .report
                .push_file(Severity::Error, "file contains no data rows and @permitEmpty is not set");
            valid = false;
        }

        if !eval.finish() {
            debug!("integrity check found unreferenced files");
            valid = false;
        }

        let report = std::mem::take(&mut eval.ctx.report);
        info!(
            rows,
            valid,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "validation run finished"
        );
        Ok(ValidationOutcome {
            valid,
            report,
            rows,
        })
    }

    fn expected_columns(&self) -> usize {
        self.schema
            .directives()
            .total_columns
            .unwrap_or(self.schema.columns().len())
    }

    fn check_count(&self, found: usize) -> EvalResult<()> {
        let expected = self.expected_columns();
        if found != expected {
            warn!(expected, found, "column count mismatch");
            return Err(EvalError::ColumnCount { expected, found });
        }
        Ok(())
    }

    /// Count first, then names position by position.
    fn check_header(&self, header: &[String]) -> EvalResult<()> {
        self.check_count(header.len())?;
        let directives = self.schema.directives();
        for (position, (column, found)) in self.schema.columns().iter().zip(header).enumerate() {
            if directives.column_key(found.trim()) != directives.column_key(&column.name) {
                warn!(position, expected = %column.name, found = %found, "header mismatch");
                return Err(EvalError::HeaderMismatch {
                    position: position + 1,
                    expected: column.name.clone(),
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvs_types::ast::*;
    use csvs_types::Version;

    fn schema(directives: GlobalDirectives, names: &[&str]) -> Schema {
        Schema {
            prolog: Prolog {
                version: Version::V1_0,
                global_directives: directives,
            },
            body: Body {
                columns: names
                    .iter()
                    .map(|n| ColumnDefinition {
                        name: n.to_string(),
                        rule: ColumnRule {
                            exprs: vec![ColumnValidationExpr::new(ValidatingExpr::NotEmpty)],
                            directives: ColumnDirectives::default(),
                        },
                    })
                    .collect(),
                state_slots: 0,
            },
        }
    }

    #[test]
    fn test_header_names_compared_by_position() {
        let s = schema(GlobalDirectives::default(), &["a", "b"]);
        let err = Validator::new(&s).validate_str("a,c\n1,2\n").unwrap_err();
        assert!(matches!(err, EvalError::HeaderMismatch { position: 2, .. }));
    }

    #[test]
    fn test_header_case_folding() {
        let directives = GlobalDirectives {
            ignore_column_name_case: true,
            ..GlobalDirectives::default()
        };
        let s = schema(directives, &["Name"]);
        let outcome = Validator::new(&s).validate_str("NAME\nx\n").unwrap();
        assert!(outcome.valid);
    }

    #[test]
    fn test_missing_header() {
        let s = schema(GlobalDirectives::default(), &["a"]);
        let err = Validator::new(&s).validate_str("").unwrap_err();
        assert!(matches!(err, EvalError::MissingHeader));
    }

    #[test]
    fn test_row_numbers_follow_header() {
        let s = schema(GlobalDirectives::default(), &["a", "b"]);
        let outcome = Validator::new(&s).validate_str("a,b\nx,y\nx,\n").unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.report.get(3, "b", Severity::Error).len(), 1);
    }

    #[test]
    fn test_quotes_are_literal_unless_quoted() {
        let s = schema(GlobalDirectives::default(), &["a"]);
        let outcome = Validator::new(&s).validate_str("a\n\"\"\n").unwrap();
        assert!(outcome.valid);

        let directives = GlobalDirectives {
            quoted: true,
            ..GlobalDirectives::default()
        };
        let s = schema(directives, &["a"]);
        let outcome = Validator::new(&s).validate_str("a\n\"\"\n").unwrap();
        assert!(!outcome.valid);
    }

    #[test]
    fn test_validate_records() {
        let s = schema(GlobalDirectives::default(), &["a"]);
        let v = Validator::new(&s);
        let outcome = v
            .validate_records(Some(vec!["a".into()]), vec![vec!["x".into()], vec![String::new()]])
            .unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.report.get(3, "a", Severity::Error).len(), 1);
        assert!(matches!(
            v.validate_records(None, Vec::new()),
            Err(EvalError::MissingHeader)
        ));
    }

    #[test]
    fn test_separator_directive() {
        let directives = GlobalDirectives {
            separator: '\t',
            ..GlobalDirectives::default()
        };
        let s = schema(directives, &["a", "b"]);
        let outcome = Validator::new(&s).validate_str("a\tb\n1\t2\n").unwrap();
        assert!(outcome.valid);
    }
}
