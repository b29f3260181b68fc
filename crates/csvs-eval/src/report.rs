//! Structured validation report.
//!
//! Messages are grouped row index → column name → severity, each group an
//! ordered list. Problems that belong to no row (an empty file) are kept
//! separately as file-level messages.

use csvs_types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type ColumnMessages = BTreeMap<Severity, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    rows: BTreeMap<u64, BTreeMap<String, ColumnMessages>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    file: Vec<FileMessage>,
}

/// A message about the input as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMessage {
    pub severity: Severity,
    pub message: String,
}

/// One flattened report line, as yielded by [`Report::messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportEntry<'a> {
    /// `None` for file-level messages.
    pub row: Option<u64>,
    pub column: Option<&'a str>,
    pub severity: Severity,
    pub message: &'a str,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: u64, column: &str, severity: Severity, message: impl Into<String>) {
        self.rows
            .entry(row)
            .or_default()
            .entry(column.to_string())
            .or_default()
            .entry(severity)
            .or_default()
            .push(message.into());
    }

    pub fn push_file(&mut self, severity: Severity, message: impl Into<String>) {
        self.file.push(FileMessage {
            severity,
            message: message.into(),
        });
    }

    /// Messages recorded for one cell at one severity.
    pub fn get(&self, row: u64, column: &str, severity: Severity) -> &[String] {
        self.rows
            .get(&row)
            .and_then(|cols| cols.get(column))
            .and_then(|sev| sev.get(&severity))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn row(&self, row: u64) -> Option<&BTreeMap<String, ColumnMessages>> {
        self.rows.get(&row)
    }

    pub fn file_messages(&self) -> &[FileMessage] {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.file.is_empty()
    }

    /// File-level messages first, then rows and columns in order.
    pub fn messages(&self) -> impl Iterator<Item = ReportEntry<'_>> {
        let file = self.file.iter().map(|m| ReportEntry {
            row: None,
            column: None,
            severity: m.severity,
            message: &m.message,
        });
        let rows = self.rows.iter().flat_map(|(row, columns)| {
            columns.iter().flat_map(move |(column, by_severity)| {
                by_severity.iter().flat_map(move |(severity, messages)| {
                    messages.iter().map(move |message| ReportEntry {
                        row: Some(*row),
                        column: Some(column.as_str()),
                        severity: *severity,
                        message: message.as_str(),
                    })
                })
            })
        });
        file.chain(rows)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages().filter(|m| m.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
