//! One CSV record, keyed by normalized column name.

use std::collections::HashMap;

/// Field values of the current record.
///
/// Keys are the declared column names as normalized by
/// `GlobalDirectives::column_key`, so lookups must normalize the same way.
/// A record shorter than the declaration simply lacks the trailing keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    /// Pair `keys` with `values` by position; surplus values are dropped.
    pub fn from_fields<K, V>(keys: &[K], values: impl IntoIterator<Item = V>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let fields = keys
            .iter()
            .zip(values)
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
