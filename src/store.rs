use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::paths::{validate_branch_name, validate_entry_name};
use crate::record;
use crate::types::{Fingerprint, TreeEntry, TreeId, Version, VersionId};

/// Compute the fingerprint of blob content (lowercase hex SHA-256).
pub fn fingerprint(content: &[u8]) -> Fingerprint {
    Fingerprint(format!("{:x}", Sha256::digest(content)))
}

/// Storage for blobs, trees, versions and head pointers.
///
/// Every write is durable when the call returns; callers rely on this to
/// order writes so no record ever references a missing object.
pub trait ObjectStore {
    /// Store `content` and return its fingerprint. Storing the same content
    /// twice is a no-op.
    fn create_blob(&self, content: &[u8]) -> Result<Fingerprint>;

    /// `true` if blob `fingerprint` is stored.
    fn has_blob(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// `true` if `content` is not the blob recorded as `fingerprint`.
    ///
    /// # Errors
    /// [`Error::MissingReference`] if the recorded blob is not stored, so an
    /// unchanged file is never reused as a dangling entry.
    fn blob_differs(&self, content: &[u8], fingerprint: &Fingerprint) -> Result<bool> {
        if !self.has_blob(fingerprint)? {
            return Err(Error::missing(format!("blob {}", fingerprint)));
        }
        Ok(self::fingerprint(content) != *fingerprint)
    }

    /// Store tree `id` with `entries` in the given order.
    fn create_tree(&self, id: TreeId, entries: &[TreeEntry]) -> Result<()>;

    /// Read tree `id` in stored order.
    ///
    /// # Errors
    /// [`Error::MissingReference`] if no such tree exists.
    fn read_tree(&self, id: TreeId) -> Result<Vec<TreeEntry>>;

    /// Read tree `id` keyed by entry name.
    fn tree_entries(&self, id: TreeId) -> Result<BTreeMap<String, TreeEntry>> {
        Ok(self
            .read_tree(id)?
            .into_iter()
            .map(|entry| (entry.name().to_string(), entry))
            .collect())
    }

    /// Current head of `branch`; `None` when no version was saved yet.
    fn get_head(&self, branch: &str) -> Result<Option<VersionId>>;

    /// Point `branch` at `version`.
    fn set_head(&self, branch: &str, version: VersionId) -> Result<()>;

    /// Read version `id`.
    ///
    /// # Errors
    /// [`Error::MissingReference`] if no such version exists,
    /// [`Error::CorruptObject`] if it does not parse.
    fn get_version(&self, id: VersionId) -> Result<Version>;

    /// Store version `id`.
    fn write_version(&self, id: VersionId, version: &Version) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn create_blob(&self, content: &[u8]) -> Result<Fingerprint> {
        (**self).create_blob(content)
    }
    fn has_blob(&self, fingerprint: &Fingerprint) -> Result<bool> {
        (**self).has_blob(fingerprint)
    }
    fn blob_differs(&self, content: &[u8], fingerprint: &Fingerprint) -> Result<bool> {
        (**self).blob_differs(content, fingerprint)
    }
    fn create_tree(&self, id: TreeId, entries: &[TreeEntry]) -> Result<()> {
        (**self).create_tree(id, entries)
    }
    fn read_tree(&self, id: TreeId) -> Result<Vec<TreeEntry>> {
        (**self).read_tree(id)
    }
    fn get_head(&self, branch: &str) -> Result<Option<VersionId>> {
        (**self).get_head(branch)
    }
    fn set_head(&self, branch: &str, version: VersionId) -> Result<()> {
        (**self).set_head(branch, version)
    }
    fn get_version(&self, id: VersionId) -> Result<Version> {
        (**self).get_version(id)
    }
    fn write_version(&self, id: VersionId, version: &Version) -> Result<()> {
        (**self).write_version(id, version)
    }
}

/// Write `data` to `path` via a temp file in the same directory, fsync,
/// rename over the target, then fsync the directory so the rename itself
/// is durable.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = std::fs::File::create(&tmp).map_err(|e| Error::storage(&tmp, e))?;
    file.write_all(data).map_err(|e| Error::storage(&tmp, e))?;
    file.sync_all().map_err(|e| Error::storage(&tmp, e))?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(|e| Error::storage(path, e))?;
    sync_parent(path)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) => std::fs::File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| Error::storage(dir, e)),
        None => Ok(()),
    }
}

// Directory handles cannot be fsynced here; the rename is as durable as the
// filesystem makes it.
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

/// Read a record, mapping a missing file to `None`.
fn read_record(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::storage(path, e)),
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Object store laid out as plain files under the metadata directory:
///
/// ```text
/// <meta>/
///   obj/blob/<fingerprint>
///   obj/tree/<id>
///   obj/version/<id>
///   head/<branch>
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    meta: PathBuf,
}

impl FileStore {
    /// Use the store rooted at `meta` without checking it.
    pub fn new(meta: impl Into<PathBuf>) -> Self {
        Self { meta: meta.into() }
    }

    /// Create the object and head directories under `meta`.
    pub fn init(meta: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(meta);
        for dir in [
            store.blob_dir(),
            store.tree_dir(),
            store.version_dir(),
            store.head_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e))?;
        }
        Ok(store)
    }

    /// Verify that every directory [`init`](Self::init) creates is present.
    pub fn validate(&self) -> Result<()> {
        for dir in [
            self.blob_dir(),
            self.tree_dir(),
            self.version_dir(),
            self.head_dir(),
        ] {
            if !dir.is_dir() {
                return Err(Error::storage_msg(format!(
                    "missing directory {}",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta
    }

    fn blob_dir(&self) -> PathBuf {
        self.meta.join("obj").join("blob")
    }

    fn tree_dir(&self) -> PathBuf {
        self.meta.join("obj").join("tree")
    }

    fn version_dir(&self) -> PathBuf {
        self.meta.join("obj").join("version")
    }

    fn head_dir(&self) -> PathBuf {
        self.meta.join("head")
    }

    fn blob_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.blob_dir().join(fingerprint.as_str())
    }

    /// Raw content of a stored blob.
    pub fn read_blob(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>> {
        let path = self.blob_path(fingerprint);
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::missing(format!("blob {}", fingerprint)))
            }
            Err(e) => Err(Error::storage(&path, e)),
        }
    }
}

impl ObjectStore for FileStore {
    fn create_blob(&self, content: &[u8]) -> Result<Fingerprint> {
        let fp = fingerprint(content);
        let path = self.blob_path(&fp);
        if !path.exists() {
            write_atomic(&path, content)?;
        }
        Ok(fp)
    }

    fn has_blob(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let path = self.blob_path(fingerprint);
        match std::fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(&path, e)),
        }
    }

    fn create_tree(&self, id: TreeId, entries: &[TreeEntry]) -> Result<()> {
        for entry in entries {
            validate_entry_name(entry.name())?;
        }
        let path = self.tree_dir().join(id.to_string());
        write_atomic(&path, record::encode_tree(entries).as_bytes())?;
        log::debug!("wrote tree {} ({} entries)", id, entries.len());
        Ok(())
    }

    fn read_tree(&self, id: TreeId) -> Result<Vec<TreeEntry>> {
        let path = self.tree_dir().join(id.to_string());
        let text = read_record(&path)?.ok_or_else(|| Error::missing(format!("tree {}", id)))?;
        record::decode_tree(&format!("tree {}", id), &text)
    }

    fn get_head(&self, branch: &str) -> Result<Option<VersionId>> {
        validate_branch_name(branch)?;
        let path = self.head_dir().join(branch);
        match read_record(&path)? {
            Some(text) => Ok(record::decode_optional(&format!("head {}", branch), &text)?
                .map(VersionId)),
            None => Ok(None),
        }
    }

    fn set_head(&self, branch: &str, version: VersionId) -> Result<()> {
        validate_branch_name(branch)?;
        let path = self.head_dir().join(branch);
        write_atomic(&path, version.to_string().as_bytes())
    }

    fn get_version(&self, id: VersionId) -> Result<Version> {
        let path = self.version_dir().join(id.to_string());
        let text =
            read_record(&path)?.ok_or_else(|| Error::missing(format!("version {}", id)))?;
        record::decode_version(&format!("version {}", id), &text)
    }

    fn write_version(&self, id: VersionId, version: &Version) -> Result<()> {
        let path = self.version_dir().join(id.to_string());
        write_atomic(&path, record::encode_version(version).as_bytes())
    }
}
