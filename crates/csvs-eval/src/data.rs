//! Data expression evaluation and string helpers.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use csvs_types::ast::{DataExpr, StringProvider};

use crate::error::DataError;
use crate::evaluator::Evaluator;
use crate::row::Row;

/// Drop the extension of the last path segment, dot included.
pub(crate) fn no_ext(value: &str) -> &str {
    let segment_start = value.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match value[segment_start..].rfind('.') {
        Some(dot) => &value[..segment_start + dot],
        None => value,
    }
}

/// Percent-decode `value` with a named character encoding (UTF-8 default).
pub(crate) fn uri_decode(value: &str, encoding: Option<&str>) -> Result<String, DataError> {
    let name = encoding.map_or_else(|| "UTF-8".to_string(), |e| e.trim().to_ascii_uppercase());
    match name.as_str() {
        "UTF-8" | "UTF8" => urlencoding::decode(value)
            .map(Cow::into_owned)
            .map_err(|_| DataError::InvalidEncoding(value.to_string(), "UTF-8")),
        "ISO-8859-1" | "LATIN1" | "LATIN-1" => Ok(urlencoding::decode_binary(value.as_bytes())
            .iter()
            .map(|&b| char::from(b))
            .collect()),
        "US-ASCII" | "ASCII" => {
            let bytes = urlencoding::decode_binary(value.as_bytes());
            if bytes.is_ascii() {
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            } else {
                Err(DataError::InvalidEncoding(value.to_string(), "US-ASCII"))
            }
        }
        _ => Err(DataError::UnsupportedEncoding(
            encoding.unwrap_or_default().trim().to_string(),
        )),
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || path.starts_with("file:") || Path::new(path).is_absolute()
}

/// `prefix` + `file`, unless `file` is already absolute.
pub(crate) fn join_path(prefix: &str, file: &str) -> String {
    if prefix.is_empty() || is_absolute(file) {
        return file.to_string();
    }
    let file = file.strip_prefix("./").unwrap_or(file);
    if prefix.ends_with('/') || prefix.ends_with('\\') {
        format!("{prefix}{file}")
    } else {
        format!("{prefix}/{file}")
    }
}

/// Turn path text (plain or a `file:` URI) into a filesystem path.
pub(crate) fn to_path(text: &str) -> PathBuf {
    if text.starts_with("file:") {
        if let Some(path) = url::Url::parse(text).ok().and_then(|u| u.to_file_path().ok()) {
            return path;
        }
    }
    PathBuf::from(text)
}

impl Evaluator<'_> {
    /// Resolve a data expression to text for the current row.
    pub fn eval_data(&mut self, expr: &DataExpr, row: &Row) -> Result<String, DataError> {
        match expr {
            DataExpr::ColumnRef(c) => self.column_value(&c.name, row).map(str::to_string),
            DataExpr::StringProvider(StringProvider::Literal(s)) => Ok(s.clone()),
            DataExpr::StringProvider(StringProvider::Expr(inner)) => self.eval_data(inner, row),
            DataExpr::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&self.eval_data(part, row)?);
                }
                Ok(out)
            }
            DataExpr::NoExt(inner) => {
                let value = self.eval_data(inner, row)?;
                Ok(no_ext(&value).to_string())
            }
            DataExpr::UriDecode { value, encoding } => {
                let value = self.eval_data(value, row)?;
                let encoding = match encoding {
                    Some(e) => Some(self.eval_data(e, row)?),
                    None => None,
                };
                uri_decode(&value, encoding.as_deref())
            }
            DataExpr::File { prefix, file } => {
                let file = self.eval_data(file, row)?;
                match prefix {
                    Some(p) => Ok(join_path(&self.eval_data(p, row)?, &file)),
                    None => Ok(file),
                }
            }
        }
    }

    /// Value of a referenced column, its name normalized like the row keys.
    pub(crate) fn column_value<'r>(&self, name: &str, row: &'r Row) -> Result<&'r str, DataError> {
        row.get(&self.directives.column_key(name))
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ext() {
        assert_eq!(no_ext("report.pdf"), "report");
        assert_eq!(no_ext("archive.tar.gz"), "archive.tar");
        assert_eq!(no_ext("dir.v2/readme"), "dir.v2/readme");
        assert_eq!(no_ext("noext"), "noext");
    }

    #[test]
    fn test_uri_decode_encodings() {
        assert_eq!(uri_decode("a%20b%C3%A9", None).unwrap(), "a bé");
        assert_eq!(uri_decode("caf%E9", Some("ISO-8859-1")).unwrap(), "café");
        assert_eq!(uri_decode("a%2Fb", Some("us-ascii")).unwrap(), "a/b");
        assert!(uri_decode("caf%E9", Some("US-ASCII")).is_err());
        assert!(uri_decode("caf%E9", None).is_err());
        assert_eq!(
            uri_decode("x", Some("EBCDIC")),
            Err(DataError::UnsupportedEncoding("EBCDIC".into()))
        );
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/data", "a.txt"), "/data/a.txt");
        assert_eq!(join_path("/data/", "./a.txt"), "/data/a.txt");
        assert_eq!(join_path("/data", "/abs/a.txt"), "/abs/a.txt");
        assert_eq!(join_path("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_to_path_accepts_file_uris() {
        assert_eq!(to_path("file:///tmp/a%20b.txt"), PathBuf::from("/tmp/a b.txt"));
        assert_eq!(to_path("rel/a.txt"), PathBuf::from("rel/a.txt"));
    }
}
