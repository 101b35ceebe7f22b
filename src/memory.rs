//! In-memory object store.
//!
//! Keeps the same contract as [`FileStore`](crate::store::FileStore) but
//! holds everything in maps, and counts writes so callers can assert that an
//! operation left the store untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::paths::{validate_branch_name, validate_entry_name};
use crate::store::{fingerprint, ObjectStore};
use crate::types::{Fingerprint, TreeEntry, TreeId, Version, VersionId};

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<Fingerprint, Vec<u8>>,
    trees: BTreeMap<TreeId, Vec<TreeEntry>>,
    versions: BTreeMap<VersionId, Version>,
    heads: HashMap<String, VersionId>,
    writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| Error::storage_msg(e.to_string()))
    }

    /// Number of objects written and head updates made so far.
    pub fn writes(&self) -> usize {
        self.lock().map(|inner| inner.writes).unwrap_or_default()
    }

    pub fn blob_count(&self) -> usize {
        self.lock().map(|inner| inner.blobs.len()).unwrap_or_default()
    }

    pub fn tree_count(&self) -> usize {
        self.lock().map(|inner| inner.trees.len()).unwrap_or_default()
    }

    pub fn version_count(&self) -> usize {
        self.lock().map(|inner| inner.versions.len()).unwrap_or_default()
    }

    /// Drop a stored blob, leaving any tree that names it dangling.
    pub fn remove_blob(&self, fingerprint: &Fingerprint) -> bool {
        self.lock()
            .map(|mut inner| inner.blobs.remove(fingerprint).is_some())
            .unwrap_or_default()
    }
}

impl ObjectStore for MemoryStore {
    fn create_blob(&self, content: &[u8]) -> Result<Fingerprint> {
        let fp = fingerprint(content);
        let mut inner = self.lock()?;
        if !inner.blobs.contains_key(&fp) {
            inner.blobs.insert(fp.clone(), content.to_vec());
            inner.writes += 1;
        }
        Ok(fp)
    }

    fn has_blob(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.lock()?.blobs.contains_key(fingerprint))
    }

    fn create_tree(&self, id: TreeId, entries: &[TreeEntry]) -> Result<()> {
        for entry in entries {
            validate_entry_name(entry.name())?;
        }
        let mut inner = self.lock()?;
        inner.trees.insert(id, entries.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn read_tree(&self, id: TreeId) -> Result<Vec<TreeEntry>> {
        self.lock()?
            .trees
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::missing(format!("tree {}", id)))
    }

    fn get_head(&self, branch: &str) -> Result<Option<VersionId>> {
        validate_branch_name(branch)?;
        Ok(self.lock()?.heads.get(branch).copied())
    }

    fn set_head(&self, branch: &str, version: VersionId) -> Result<()> {
        validate_branch_name(branch)?;
        let mut inner = self.lock()?;
        inner.heads.insert(branch.to_string(), version);
        inner.writes += 1;
        Ok(())
    }

    fn get_version(&self, id: VersionId) -> Result<Version> {
        self.lock()?
            .versions
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::missing(format!("version {}", id)))
    }

    fn write_version(&self, id: VersionId, version: &Version) -> Result<()> {
        let mut inner = self.lock()?;
        inner.versions.insert(id, version.clone());
        inner.writes += 1;
        Ok(())
    }
}
