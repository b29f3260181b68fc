use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a parse node sits in the schema text, as reported by the parser.
///
/// Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// The whole of line `line`, `len` bytes long.
    pub fn line(line: u32, len: usize) -> Self {
        Self::new(line, 1, line, len as u32 + 1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// First line of `text` with anything but whitespace, and its 1-based number.
///
/// A trailing `\r` is dropped so CRLF documents read the same.
pub fn first_non_blank_line(text: &str) -> Option<(u32, &str)> {
    text.lines()
        .zip(1u32..)
        .map(|(line, n)| (n, line.trim_end_matches('\r')))
        .find(|(_, line)| !line.trim().is_empty())
}
