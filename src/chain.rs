//! Version chain orchestration: when to create a version and how the head
//! moves.
//!
//! Write order is tree objects, then the version, then the head, so a crash
//! can leave unreferenced objects behind but never a head or a version that
//! points at something missing.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::ignore::IgnoreSet;
use crate::index::IndexAllocator;
use crate::paths::{format_version_message, validate_branch_name};
use crate::snapshot::Snapshotter;
use crate::store::ObjectStore;
use crate::types::{
    IndexClass, SaveOptions, SaveOutcome, StatusReport, TreeEntry, TreeId, Version, VersionId,
};
use crate::worktree::WorkTree;

/// Message of the first version in a repository.
pub const INITIAL_MESSAGE: &str = "Initial save";

/// Single line of history rooted at one head pointer.
pub struct VersionChain<'a> {
    store: &'a dyn ObjectStore,
    counters: &'a dyn IndexAllocator,
    branch: String,
}

impl<'a> VersionChain<'a> {
    /// Bind a chain to `branch` in `store`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidName`] if `branch` is not a valid head name.
    pub fn new(
        store: &'a dyn ObjectStore,
        counters: &'a dyn IndexAllocator,
        branch: impl Into<String>,
    ) -> Result<Self> {
        let branch = branch.into();
        validate_branch_name(&branch)?;
        Ok(Self {
            store,
            counters,
            branch,
        })
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// The version head points at, or `None` before the first save.
    ///
    /// # Errors
    /// [`Error::HeadUnreadable`] if the head record exists but cannot be
    /// read or parsed.
    pub fn head(&self) -> Result<Option<VersionId>> {
        self.store
            .get_head(&self.branch)
            .map_err(|e| Error::head_unreadable(&self.branch, e))
    }

    /// Read version `id`.
    ///
    /// # Errors
    /// [`Error::VersionUnreadable`] if it is missing or corrupt.
    pub fn version(&self, id: VersionId) -> Result<Version> {
        self.store
            .get_version(id)
            .map_err(|e| Error::version_unreadable(id.0, e))
    }

    fn head_version(&self) -> Result<Option<(VersionId, Version)>> {
        match self.head()? {
            Some(id) => Ok(Some((id, self.version(id)?))),
            None => Ok(None),
        }
    }

    /// Snapshot `worktree` and advance the head if anything changed.
    ///
    /// Nothing is written when the tree matches the head version. On any
    /// error the head is left where it was.
    pub fn save(
        &self,
        worktree: &dyn WorkTree,
        ignores: &IgnoreSet,
        options: &SaveOptions,
    ) -> Result<SaveOutcome> {
        let snapshotter = Snapshotter::new(self.store, self.counters, worktree, ignores);

        let (parent, recorded) = match self.head_version()? {
            Some((id, version)) => (id, version.tree),
            None => return self.save_initial(&snapshotter, options),
        };

        let tree = snapshotter.reconcile("", recorded)?;
        if tree == recorded {
            log::info!("no changes since version {}", parent);
            return Ok(SaveOutcome::NoChanges { head: parent });
        }

        let version = VersionId(self.counters.next_index(IndexClass::Version)?);
        self.commit(
            version,
            Version {
                parent: Some(parent),
                tree,
                message: format_version_message(version, options.message.as_deref()),
            },
        )?;
        Ok(SaveOutcome::Saved {
            version,
            parent,
            tree,
        })
    }

    fn save_initial(
        &self,
        snapshotter: &Snapshotter<'_>,
        options: &SaveOptions,
    ) -> Result<SaveOutcome> {
        let version = VersionId(self.counters.next_index(IndexClass::Version)?);
        let tree = TreeId(self.counters.next_index(IndexClass::Tree)?);
        snapshotter.materialize("", tree)?;

        self.commit(
            version,
            Version {
                parent: None,
                tree,
                message: options
                    .message
                    .clone()
                    .unwrap_or_else(|| INITIAL_MESSAGE.to_string()),
            },
        )?;
        Ok(SaveOutcome::Initial { version, tree })
    }

    /// Write the version record, then move the head onto it.
    fn commit(&self, id: VersionId, version: Version) -> Result<()> {
        self.store.write_version(id, &version)?;
        self.store.set_head(&self.branch, id)?;
        log::info!(
            "saved version {} (tree {}, parent {})",
            id,
            version.tree,
            version
                .parent
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".into())
        );
        Ok(())
    }

    /// Classify `worktree` against the head version without writing.
    pub fn status(&self, worktree: &dyn WorkTree, ignores: &IgnoreSet) -> Result<StatusReport> {
        let recorded = self.head_version()?.map(|(_, version)| version.tree);
        Snapshotter::new(self.store, self.counters, worktree, ignores).status(recorded)
    }

    /// `true` if a save would record anything.
    pub fn has_pending_changes(
        &self,
        worktree: &dyn WorkTree,
        ignores: &IgnoreSet,
    ) -> Result<bool> {
        Ok(!self.status(worktree, ignores)?.is_clean())
    }

    /// All versions from the head back to the first one, newest first.
    ///
    /// # Errors
    /// [`Error::CorruptObject`] if the parent links form a cycle, or
    /// [`Error::VersionUnreadable`] for a broken link.
    pub fn history(&self) -> Result<Vec<(VersionId, Version)>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut next = self.head()?;

        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(Error::corrupt(format!(
                    "version chain of '{}' loops back to version {}",
                    self.branch, id
                )));
            }
            let version = self.version(id)?;
            next = version.parent;
            out.push((id, version));
        }
        Ok(out)
    }

    /// Walk the whole history and check that every tree and blob it
    /// references, directly or through subtrees, exists. Returns the number
    /// of versions.
    pub fn verify(&self) -> Result<usize> {
        let history = self.history()?;
        let mut checked = HashSet::new();
        for (id, version) in &history {
            self.verify_tree(version.tree, &mut checked)
                .map_err(|e| Error::version_unreadable(id.0, e))?;
        }
        Ok(history.len())
    }

    fn verify_tree(&self, id: TreeId, checked: &mut HashSet<TreeId>) -> Result<()> {
        if !checked.insert(id) {
            return Ok(());
        }
        for entry in self.store.read_tree(id)? {
            match entry {
                TreeEntry::Tree { id: child, .. } => self.verify_tree(child, checked)?,
                TreeEntry::Blob { fingerprint, name } => {
                    if !self.store.has_blob(&fingerprint)? {
                        return Err(Error::missing(format!(
                            "blob {} for '{}' in tree {}",
                            fingerprint, name, id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
