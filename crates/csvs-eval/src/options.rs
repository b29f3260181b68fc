//! Caller-supplied settings for a validation run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Run configuration. Every field has a default, so a partial JSON or TOML
/// document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Fold case in every textual comparison, on top of `@ignoreCase`.
    pub ignore_case: bool,
    /// Cache existence probes, listings and digests per path for one run.
    pub memoize_filesystem: bool,
    /// Directory that relative paths in filesystem rules resolve against.
    pub base_dir: Option<PathBuf>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            memoize_filesystem: true,
            base_dir: None,
        }
    }
}

impl ValidationOptions {
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_memoization(mut self, memoize: bool) -> Self {
        self.memoize_filesystem = memoize;
        self
    }

    /// Anchor a relative path at `base_dir`; absolute paths pass through.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}
