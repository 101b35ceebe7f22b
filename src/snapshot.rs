//! Recursive snapshot of a working tree against a recorded tree.
//!
//! One traversal serves both save and status. In materialize mode it writes
//! blobs and trees and returns the id of the tree that now describes the
//! directory; in classify mode it only records what *would* change.
//!
//! Unchanged directories keep their recorded tree id, so a save rewrites
//! exactly the trees on the path from each change up to the root and shares
//! every other subtree with the previous version.

use crate::error::Result;
use crate::ignore::IgnoreSet;
use crate::index::IndexAllocator;
use crate::paths;
use crate::store::ObjectStore;
use crate::types::{DirEntry, Fingerprint, IndexClass, StatusReport, TreeEntry, TreeId};
use crate::worktree::WorkTree;

enum Mode<'r> {
    /// Write blobs and trees.
    Materialize,
    /// Write nothing; collect paths into the report.
    Classify(&'r mut StatusReport),
}

/// Result of comparing one directory with its recorded tree.
enum DirOutcome {
    Unchanged,
    Rewritten(TreeId),
    Dirty,
}

/// Walks a [`WorkTree`], reading and writing objects through explicit
/// store and allocator handles.
pub struct Snapshotter<'a> {
    store: &'a dyn ObjectStore,
    counters: &'a dyn IndexAllocator,
    worktree: &'a dyn WorkTree,
    ignores: &'a IgnoreSet,
}

impl<'a> Snapshotter<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        counters: &'a dyn IndexAllocator,
        worktree: &'a dyn WorkTree,
        ignores: &'a IgnoreSet,
    ) -> Self {
        Self {
            store,
            counters,
            worktree,
            ignores,
        }
    }

    /// Record directory `dir` and everything below it as tree `id`.
    ///
    /// Every subdirectory gets a freshly allocated tree index. Child trees
    /// are written before the tree that references them.
    pub fn materialize(&self, dir: &str, id: TreeId) -> Result<()> {
        let mut entries = Vec::new();

        for item in self.visible(dir)? {
            let path = paths::join(dir, &item.name);
            if item.is_dir() {
                let child = self.allocate_tree()?;
                self.materialize(&path, child)?;
                entries.push(TreeEntry::tree(child, item.name));
            } else {
                let fingerprint = self.save_blob(&path)?;
                entries.push(TreeEntry::blob(fingerprint, item.name));
            }
        }

        self.store.create_tree(id, &entries)
    }

    /// Reconcile directory `dir` with tree `recorded` and return the tree id
    /// describing it now.
    ///
    /// Returns `recorded` itself when nothing below `dir` changed; no object
    /// is written in that case.
    pub fn reconcile(&self, dir: &str, recorded: TreeId) -> Result<TreeId> {
        match self.compare(dir, recorded, &mut Mode::Materialize)? {
            DirOutcome::Rewritten(id) => Ok(id),
            DirOutcome::Unchanged | DirOutcome::Dirty => Ok(recorded),
        }
    }

    /// Classify the working tree against root tree `recorded` without
    /// writing anything.
    ///
    /// With no recorded tree every visible file is new.
    pub fn status(&self, recorded: Option<TreeId>) -> Result<StatusReport> {
        let mut report = StatusReport::new();
        match recorded {
            Some(root) => {
                self.compare("", root, &mut Mode::Classify(&mut report))?;
            }
            None => {
                self.collect_new("", &mut report.new)?;
            }
        }
        Ok(report)
    }

    fn compare(&self, dir: &str, recorded: TreeId, mode: &mut Mode<'_>) -> Result<DirOutcome> {
        let recorded_entries = self.store.tree_entries(recorded)?;
        let listing = self.visible(dir)?;
        let mut entries = Vec::with_capacity(listing.len());
        let mut changed = false;

        for item in &listing {
            let path = paths::join(dir, &item.name);
            match (recorded_entries.get(&item.name), item.is_dir()) {
                (Some(TreeEntry::Tree { id, .. }), true) => {
                    match self.compare(&path, *id, mode)? {
                        DirOutcome::Unchanged => {
                            log::debug!("reusing tree {} for {}", id, path);
                            entries.push(TreeEntry::tree(*id, item.name.as_str()));
                        }
                        DirOutcome::Rewritten(new_id) => {
                            changed = true;
                            entries.push(TreeEntry::tree(new_id, item.name.as_str()));
                        }
                        DirOutcome::Dirty => changed = true,
                    }
                }
                (Some(TreeEntry::Blob { fingerprint, .. }), false) => {
                    let content = self.worktree.read_file(&path)?;
                    if !self.store.blob_differs(&content, fingerprint)? {
                        entries.push(TreeEntry::blob(fingerprint.clone(), item.name.as_str()));
                        continue;
                    }
                    changed = true;
                    match mode {
                        Mode::Materialize => {
                            log::info!("saving {}", path);
                            let fingerprint = self.store.create_blob(&content)?;
                            entries.push(TreeEntry::blob(fingerprint, item.name.as_str()));
                        }
                        Mode::Classify(report) => report.modified.push(path),
                    }
                }
                (recorded_entry, _) => {
                    // New name, or a file that became a directory (or the reverse).
                    changed = true;
                    match mode {
                        Mode::Materialize => entries.push(self.record_new(&path, item)?),
                        Mode::Classify(report) if recorded_entry.is_some() => {
                            report.modified.push(path)
                        }
                        Mode::Classify(report) => {
                            if item.is_dir() {
                                self.collect_new_dir(&path, &mut report.new)?;
                            } else {
                                report.new.push(path);
                            }
                        }
                    }
                }
            }
        }

        let is_missing = |name: &String| {
            !self.ignores.is_ignored(name) && !listing.iter().any(|item| &item.name == name)
        };

        match mode {
            Mode::Materialize => {
                // Any single deletion forces a rewrite, so stop at the first.
                if !changed {
                    changed = recorded_entries.keys().any(is_missing);
                }
            }
            Mode::Classify(report) => {
                for (name, entry) in recorded_entries.iter().filter(|(n, _)| is_missing(*n)) {
                    changed = true;
                    report.deleted.push(deleted_path(dir, name, entry));
                }
            }
        }

        if !changed {
            return Ok(DirOutcome::Unchanged);
        }
        match mode {
            Mode::Materialize => {
                let id = self.allocate_tree()?;
                self.store.create_tree(id, &entries)?;
                log::debug!("rewrote {} as tree {} (was {})", display_dir(dir), id, recorded);
                Ok(DirOutcome::Rewritten(id))
            }
            Mode::Classify(_) => Ok(DirOutcome::Dirty),
        }
    }

    /// Write the objects for an entry that has no usable recorded counterpart.
    fn record_new(&self, path: &str, item: &DirEntry) -> Result<TreeEntry> {
        if item.is_dir() {
            let id = self.allocate_tree()?;
            self.materialize(path, id)?;
            Ok(TreeEntry::tree(id, item.name.as_str()))
        } else {
            let fingerprint = self.save_blob(path)?;
            Ok(TreeEntry::blob(fingerprint, item.name.as_str()))
        }
    }

    /// List every visible file below `dir`. Returns `true` if any was found.
    fn collect_new(&self, dir: &str, out: &mut Vec<String>) -> Result<bool> {
        let mut found = false;
        for item in self.visible(dir)? {
            let path = paths::join(dir, &item.name);
            if item.is_dir() {
                found |= self.collect_new_dir(&path, out)?;
            } else {
                out.push(path);
                found = true;
            }
        }
        Ok(found)
    }

    /// Like [`collect_new`](Self::collect_new) for a new subdirectory, which
    /// is listed itself (with a trailing `/`) when it holds no visible file,
    /// since a save still records it.
    fn collect_new_dir(&self, dir: &str, out: &mut Vec<String>) -> Result<bool> {
        if !self.collect_new(dir, out)? {
            out.push(format!("{}/", dir));
        }
        Ok(true)
    }

    fn visible(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let mut listing = self.worktree.list_dir(dir)?;
        listing.retain(|item| !self.ignores.is_ignored(&item.name));
        Ok(listing)
    }

    fn save_blob(&self, path: &str) -> Result<Fingerprint> {
        log::info!("saving {}", path);
        let content = self.worktree.read_file(path)?;
        self.store.create_blob(&content)
    }

    fn allocate_tree(&self) -> Result<TreeId> {
        Ok(TreeId(self.counters.next_index(IndexClass::Tree)?))
    }
}

fn deleted_path(dir: &str, name: &str, entry: &TreeEntry) -> String {
    let path = paths::join(dir, name);
    if entry.is_tree() {
        format!("{}/", path)
    } else {
        path
    }
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() {
        "."
    } else {
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryCounters;
    use crate::memory::MemoryStore;
    use crate::worktree::MemoryTree;
    use std::collections::BTreeMap;

    type RecordedEntries = BTreeMap<String, TreeEntry>;

    struct Fixture {
        store: MemoryStore,
        counters: MemoryCounters,
        ignores: IgnoreSet,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                counters: MemoryCounters::new(),
                ignores: IgnoreSet::new(),
            }
        }

        fn snap<'a>(&'a self, tree: &'a MemoryTree) -> Snapshotter<'a> {
            Snapshotter::new(&self.store, &self.counters, tree, &self.ignores)
        }

        fn record(&self, tree: &MemoryTree) -> TreeId {
            let id = TreeId(self.counters.next_index(IndexClass::Tree).unwrap());
            self.snap(tree).materialize("", id).unwrap();
            id
        }

        fn entries(&self, id: TreeId) -> RecordedEntries {
            self.store.tree_entries(id).unwrap()
        }
    }

    fn tree_id(entries: &RecordedEntries, name: &str) -> TreeId {
        match &entries[name] {
            TreeEntry::Tree { id, .. } => *id,
            other => panic!("{} is not a tree: {:?}", name, other),
        }
    }

    #[test]
    fn materialize_nested() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("x.txt", "x").write("sub/y.txt", "y");
        let root = fx.record(&wt);

        let entries = fx.entries(root);
        assert_eq!(entries.len(), 2);
        let sub = fx.entries(tree_id(&entries, "sub"));
        assert!(matches!(sub["y.txt"], TreeEntry::Blob { .. }));
        assert_eq!(fx.store.tree_count(), 2);
        assert_eq!(fx.store.blob_count(), 2);
    }

    #[test]
    fn materialize_skips_ignored() {
        let mut fx = Fixture::new();
        fx.ignores.add_names(&["target", "*.log"]);
        let mut wt = MemoryTree::new();
        wt.write("a.rs", "").write("target/out", "").write("run.log", "");
        let root = fx.record(&wt);
        let entries = fx.entries(root);
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["a.rs"]);
    }

    #[test]
    fn materialize_empty_dir() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.mkdir("empty");
        let root = fx.record(&wt);
        let empty = tree_id(&fx.entries(root), "empty");
        assert!(fx.entries(empty).is_empty());
    }

    #[test]
    fn reconcile_unchanged_returns_recorded() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("x.txt", "x").write("a/b/c.txt", "c");
        let root = fx.record(&wt);
        let writes = fx.store.writes();

        assert_eq!(fx.snap(&wt).reconcile("", root).unwrap(), root);
        assert_eq!(fx.store.writes(), writes);
    }

    #[test]
    fn reconcile_copy_on_write() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("a/b/c.txt", "c")
            .write("a/sibling/s.txt", "s")
            .write("other/o.txt", "o");
        let root = fx.record(&wt);
        let before = fx.entries(root);

        wt.write("a/b/c.txt", "changed");
        let new_root = fx.snap(&wt).reconcile("", root).unwrap();
        assert_ne!(new_root, root);

        let after = fx.entries(new_root);
        assert_eq!(tree_id(&after, "other"), tree_id(&before, "other"));
        assert_ne!(tree_id(&after, "a"), tree_id(&before, "a"));

        let a_before = fx.entries(tree_id(&before, "a"));
        let a_after = fx.entries(tree_id(&after, "a"));
        assert_eq!(tree_id(&a_after, "sibling"), tree_id(&a_before, "sibling"));
        assert_ne!(tree_id(&a_after, "b"), tree_id(&a_before, "b"));
    }

    #[test]
    fn reconcile_new_directory() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("x.txt", "x");
        let root = fx.record(&wt);
        let before = fx.entries(root);
        let blobs = fx.store.blob_count();

        wt.write("sub/y.txt", "y");
        let next_tree = fx.counters.peek(IndexClass::Tree);
        let new_root = fx.snap(&wt).reconcile("", root).unwrap();

        // One index for "sub", one for the rewritten root.
        assert_eq!(fx.counters.peek(IndexClass::Tree), next_tree + 2);
        assert_eq!(fx.store.blob_count(), blobs + 1);
        let after = fx.entries(new_root);
        assert_eq!(after["x.txt"], before["x.txt"]);
        assert_eq!(tree_id(&after, "sub"), TreeId(next_tree));
    }

    #[test]
    fn reconcile_deletion_rewrites() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("keep.txt", "k").write("gone.txt", "g");
        let root = fx.record(&wt);

        wt.remove("gone.txt");
        let new_root = fx.snap(&wt).reconcile("", root).unwrap();
        assert_ne!(new_root, root);
        assert!(!fx.entries(new_root).contains_key("gone.txt"));
    }

    #[test]
    fn reconcile_kind_change() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("thing", "file");
        let root = fx.record(&wt);

        wt.remove("thing").write("thing/inner.txt", "now a dir");
        let new_root = fx.snap(&wt).reconcile("", root).unwrap();
        let entries = fx.entries(new_root);
        let inner = fx.entries(tree_id(&entries, "thing"));
        assert!(inner.contains_key("inner.txt"));
    }

    #[test]
    fn reconcile_newly_ignored_entry_is_not_a_deletion() {
        let mut fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("a.txt", "a").write("build.log", "b");
        let root = fx.record(&wt);

        fx.ignores.insert("*.log");
        assert_eq!(fx.snap(&wt).reconcile("", root).unwrap(), root);
    }

    #[test]
    fn reconcile_missing_subtree_fails() {
        let fx = Fixture::new();
        fx.store
            .create_tree(TreeId(0), &[TreeEntry::tree(TreeId(77), "sub")])
            .unwrap();
        let mut wt = MemoryTree::new();
        wt.write("sub/f", "f");
        let err = fx.snap(&wt).reconcile("", TreeId(0)).unwrap_err();
        assert!(matches!(err, crate::Error::MissingReference(_)));
    }

    #[test]
    fn status_classifies_without_writing() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("mod.txt", "1")
            .write("del1.txt", "d")
            .write("del2.txt", "d")
            .write("dir/old.txt", "o");
        let root = fx.record(&wt);
        let writes = fx.store.writes();
        let trees = fx.counters.peek(IndexClass::Tree);

        wt.write("mod.txt", "2")
            .remove("del1.txt")
            .remove("del2.txt")
            .remove("dir/old.txt")
            .write("fresh/a.txt", "a")
            .mkdir("fresh/empty")
            .write("top.txt", "t");

        let report = fx.snap(&wt).status(Some(root)).unwrap();
        assert_eq!(report.modified, vec!["mod.txt"]);
        // Deletions inside a subdirectory are found while descending, before
        // the root's own missing entries.
        assert_eq!(report.deleted, vec!["dir/old.txt", "del1.txt", "del2.txt"]);
        assert_eq!(report.new, vec!["fresh/a.txt", "fresh/empty/", "top.txt"]);
        assert_eq!(fx.store.writes(), writes);
        assert_eq!(fx.counters.peek(IndexClass::Tree), trees);
    }

    #[test]
    fn status_reports_deleted_directory() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("d/x", "x").write("y", "y");
        let root = fx.record(&wt);
        wt.remove("d");
        let report = fx.snap(&wt).status(Some(root)).unwrap();
        assert_eq!(report.deleted, vec!["d/"]);
    }

    #[test]
    fn status_without_recorded_tree_lists_files() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("b.txt", "").write("a/c.txt", "");
        let report = fx.snap(&wt).status(None).unwrap();
        assert_eq!(report.new, vec!["a/c.txt", "b.txt"]);
        assert!(report.deleted.is_empty());
        assert_eq!(fx.store.writes(), 0);
    }

    #[test]
    fn status_kind_change_is_modification() {
        let fx = Fixture::new();
        let mut wt = MemoryTree::new();
        wt.write("thing", "file");
        let root = fx.record(&wt);
        wt.remove("thing").mkdir("thing");
        let report = fx.snap(&wt).status(Some(root)).unwrap();
        assert_eq!(report.modified, vec!["thing"]);
        assert!(report.new.is_empty());
    }
}
