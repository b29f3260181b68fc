//! Filesystem capability used by the file rules.
//!
//! Rules never touch `std::fs` directly; they go through a [`Filesystem`]
//! so runs can be pointed at an in-memory tree.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait Filesystem {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Entry names directly under `path`, sorted.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// An in-memory tree. Adding a file creates its parent directories.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    // `None` marks a directory
    entries: BTreeMap<PathBuf, Option<Vec<u8>>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.entries.entry(ancestor.to_path_buf()).or_insert(None);
        }
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.entries.insert(path.to_path_buf(), Some(contents.into()));
        self
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
    }
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.get(path), Some(None))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        if !self.is_dir(path) {
            return Err(Self::not_found(path));
        }
        Ok(self
            .entries
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.entries.get(path) {
            Some(Some(bytes)) => Ok(bytes.clone()),
            Some(None) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }
}

/// Resolve `path` against the actual entries on disk, ignoring case.
///
/// Walks one component at a time; at each level an exact match is
/// preferred, otherwise the first entry equal under case folding is taken.
/// Returns `None` as soon as a component has no match.
pub fn resolve_caseless(fs: &dyn Filesystem, path: &Path) -> Option<PathBuf> {
    if fs.exists(path) {
        return Some(path.to_path_buf());
    }
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => {
                let exact = resolved.join(name);
                if fs.exists(&exact) {
                    resolved = exact;
                    continue;
                }
                let wanted = name.to_string_lossy().to_lowercase();
                let dir = if resolved.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    resolved.as_path()
                };
                let found = fs
                    .list_dir(dir)
                    .ok()?
                    .into_iter()
                    .find(|entry| entry.to_lowercase() == wanted)?;
                resolved.push(found);
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Some(resolved)
}
