//! Per-run mutable state.
//!
//! Everything a validation run remembers lives here: the row cursor, the
//! report, the memory of stateful rules keyed by [`StateSlot`], and the
//! filesystem probe cache. A fresh context per run is what keeps a
//! compiled schema reusable.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use csvs_types::ast::StateSlot;
use csvs_types::{FolderSpec, HashAlgorithm, Severity};

use crate::checksum::hex_digest;
use crate::fs::{self, Filesystem};
use crate::report::Report;

/// Memory of one stateful rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum SlotMemory {
    #[default]
    Vacant,
    /// `unique`: every key seen so far.
    Seen(HashSet<Vec<String>>),
    /// `identical`: the value fixed by the first row.
    Memo(String),
    /// `integrityCheck`: files referenced so far.
    Integrity(IntegrityMemory),
}

/// References collected by one `integrityCheck` rule during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntegrityMemory {
    pub column: String,
    pub severity: Severity,
    pub folders: FolderSpec,
    /// Checked root folder → paths (relative to it) that rows referenced.
    pub roots: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

/// Memoized filesystem answers for one run.
#[derive(Debug, Default)]
pub(crate) struct ProbeCache {
    enabled: bool,
    exists: HashMap<PathBuf, bool>,
    listings: HashMap<PathBuf, Option<Vec<String>>>,
    digests: HashMap<(PathBuf, HashAlgorithm), Option<String>>,
    caseless: HashMap<PathBuf, Option<PathBuf>>,
}

impl ProbeCache {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub(crate) fn exists(&mut self, fs: &dyn Filesystem, path: &Path) -> bool {
        if !self.enabled {
            return fs.exists(path);
        }
        *self
            .exists
            .entry(path.to_path_buf())
            .or_insert_with(|| fs.exists(path))
    }

    pub(crate) fn list_dir(&mut self, fs: &dyn Filesystem, path: &Path) -> Option<Vec<String>> {
        if !self.enabled {
            return fs.list_dir(path).ok();
        }
        self.listings
            .entry(path.to_path_buf())
            .or_insert_with(|| fs.list_dir(path).ok())
            .clone()
    }

    /// Hex digest of the file, or `None` when it cannot be read.
    pub(crate) fn digest(
        &mut self,
        fs: &dyn Filesystem,
        path: &Path,
        algorithm: HashAlgorithm,
    ) -> Option<String> {
        let compute = || fs.read_bytes(path).ok().map(|b| hex_digest(algorithm, &b));
        if !self.enabled {
            return compute();
        }
        self.digests
            .entry((path.to_path_buf(), algorithm))
            .or_insert_with(compute)
            .clone()
    }

    pub(crate) fn resolve_caseless(&mut self, fs: &dyn Filesystem, path: &Path) -> Option<PathBuf> {
        if !self.enabled {
            return fs::resolve_caseless(fs, path);
        }
        self.caseless
            .entry(path.to_path_buf())
            .or_insert_with(|| fs::resolve_caseless(fs, path))
            .clone()
    }
}

/// Mutable state of one validation run.
#[derive(Debug)]
pub struct RunContext {
    /// Line number of the record being validated.
    pub row_index: u64,
    /// Declared name of the column being validated.
    pub column: String,
    /// Severity the current column reports at, whatever its operands do.
    pub severity: Severity,
    pub report: Report,
    slots: Vec<SlotMemory>,
    pub(crate) probes: ProbeCache,
}

impl RunContext {
    pub fn new(state_slots: usize, memoize_filesystem: bool) -> Self {
        Self {
            row_index: 0,
            column: String::new(),
            severity: Severity::Error,
            report: Report::new(),
            slots: vec![SlotMemory::Vacant; state_slots],
            probes: ProbeCache::new(memoize_filesystem),
        }
    }

    fn slot(&mut self, slot: StateSlot) -> &mut SlotMemory {
        if slot.0 >= self.slots.len() {
            self.slots.resize(slot.0 + 1, SlotMemory::Vacant);
        }
        &mut self.slots[slot.0]
    }

    /// Record `key` for a `unique` rule; `true` on its first occurrence.
    pub(crate) fn first_seen(&mut self, slot: StateSlot, key: Vec<String>) -> bool {
        let memory = self.slot(slot);
        if !matches!(memory, SlotMemory::Seen(_)) {
            *memory = SlotMemory::Seen(HashSet::new());
        }
        match memory {
            SlotMemory::Seen(seen) => seen.insert(key),
            _ => false,
        }
    }

    /// The value an `identical` rule requires, seeding it on first use.
    pub(crate) fn memo(&mut self, slot: StateSlot, value: &str) -> String {
        match self.slot(slot) {
            SlotMemory::Memo(memo) => memo.clone(),
            memory => {
                *memory = SlotMemory::Memo(value.to_string());
                value.to_string()
            }
        }
    }

    /// Register an integrity root and, when given, a path referenced under it.
    pub(crate) fn record_reference(
        &mut self,
        slot: StateSlot,
        folders: FolderSpec,
        severity: Severity,
        root: &Path,
        relative: Option<&Path>,
    ) {
        let column = self.column.clone();
        let memory = self.slot(slot);
        if !matches!(memory, SlotMemory::Integrity(_)) {
            *memory = SlotMemory::Integrity(IntegrityMemory {
                column,
                severity,
                folders,
                roots: BTreeMap::new(),
            });
        }
        if let SlotMemory::Integrity(integrity) = memory {
            let referenced = integrity.roots.entry(root.to_path_buf()).or_default();
            if let Some(relative) = relative {
                referenced.insert(relative.to_path_buf());
            }
        }
    }

    /// Drain the integrity memories for the end-of-run pass.
    pub(crate) fn take_integrity(&mut self) -> Vec<IntegrityMemory> {
        self.slots
            .iter_mut()
            .filter_map(|m| match std::mem::take(m) {
                SlotMemory::Integrity(i) => Some(i),
                other => {
                    *m = other;
                    None
                }
            })
            .collect()
    }

    pub(crate) fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let row = self.row_index;
        let column = self.column.clone();
        self.report.push(row, &column, severity, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFilesystem;

    #[test]
    fn test_unique_memory() {
        let mut ctx = RunContext::new(1, true);
        assert!(ctx.first_seen(StateSlot(0), vec!["a".into()]));
        assert!(ctx.first_seen(StateSlot(0), vec!["b".into()]));
        assert!(!ctx.first_seen(StateSlot(0), vec!["a".into()]));
    }

    #[test]
    fn test_identical_memory_is_seeded_once() {
        let mut ctx = RunContext::new(1, true);
        assert_eq!(ctx.memo(StateSlot(0), "x"), "x");
        assert_eq!(ctx.memo(StateSlot(0), "y"), "x");
    }

    #[test]
    fn test_slots_are_independent() {
        let mut ctx = RunContext::new(2, true);
        assert!(ctx.first_seen(StateSlot(0), vec!["a".into()]));
        assert!(ctx.first_seen(StateSlot(1), vec!["a".into()]));
    }

    #[test]
    fn test_take_integrity_leaves_other_memory() {
        let mut ctx = RunContext::new(2, true);
        ctx.column = "file".into();
        ctx.memo(StateSlot(0), "x");
        ctx.record_reference(
            StateSlot(1),
            FolderSpec::ExcludeFolder,
            Severity::Error,
            Path::new("/root"),
            Some(Path::new("a.txt")),
        );
        let taken = ctx.take_integrity();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].column, "file");
        assert_eq!(ctx.memo(StateSlot(0), "y"), "x");
    }

    #[test]
    fn test_probe_cache_memoizes() {
        let mut fs = MemoryFilesystem::new();
        fs.add_file("/a.txt", b"abc".to_vec());
        let mut cache = ProbeCache::new(true);
        assert!(cache.exists(&fs, Path::new("/a.txt")));
        fs.add_file("/b.txt", b"".to_vec());
        // answer for /a.txt is cached; /b.txt is probed fresh
        assert!(cache.exists(&fs, Path::new("/b.txt")));
        assert_eq!(
            cache.digest(&fs, Path::new("/a.txt"), HashAlgorithm::Sha256).as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(cache.digest(&fs, Path::new("/missing"), HashAlgorithm::Sha256), None);
    }
}
