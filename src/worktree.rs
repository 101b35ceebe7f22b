//! Directory-listing abstraction the snapshot engine walks.
//!
//! Paths handed to a [`WorkTree`] are relative to its root, `/`-separated,
//! with the empty string naming the root itself.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::DirEntry;

/// A directory tree the engine can list and read.
pub trait WorkTree {
    /// Children of directory `dir`, sorted by name.
    fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>>;

    /// Full content of file `path`.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
}

impl<W: WorkTree + ?Sized> WorkTree for &W {
    fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        (**self).list_dir(dir)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read_file(path)
    }
}

// ---------------------------------------------------------------------------
// DiskTree
// ---------------------------------------------------------------------------

/// The real filesystem below `root`.
///
/// Symlinks to files are read through; symlinks to directories and
/// dangling links are skipped so a walk cannot loop.
#[derive(Debug, Clone)]
pub struct DiskTree {
    root: PathBuf,
}

impl DiskTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }
}

impl WorkTree for DiskTree {
    fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let path = self.resolve(dir);
        let mut entries = Vec::new();

        for item in std::fs::read_dir(&path).map_err(|e| Error::io(&path, e))? {
            let item = item.map_err(|e| Error::io(&path, e))?;
            let name = match item.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    log::warn!("skipping non-UTF-8 name {:?} in {}", raw, path.display());
                    continue;
                }
            };
            let file_type = item.file_type().map_err(|e| Error::io(item.path(), e))?;

            if file_type.is_dir() {
                entries.push(DirEntry::dir(name));
            } else if file_type.is_symlink() {
                match std::fs::metadata(item.path()) {
                    Ok(meta) if meta.is_file() => entries.push(DirEntry::file(name)),
                    Ok(_) => log::warn!("skipping symlinked directory {}", item.path().display()),
                    Err(_) => log::warn!("skipping dangling symlink {}", item.path().display()),
                }
            } else if file_type.is_file() {
                entries.push(DirEntry::file(name));
            } else {
                log::warn!("skipping special file {}", item.path().display());
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        std::fs::read(&full).map_err(|e| Error::io(&full, e))
    }
}

// ---------------------------------------------------------------------------
// MemoryTree
// ---------------------------------------------------------------------------

/// An in-memory directory tree for tests and dry runs.
///
/// Directories are implied by the files below them; empty ones can be added
/// with [`mkdir`](Self::mkdir).
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace file `path`, along with any missing parents.
    pub fn write(&mut self, path: &str, content: impl Into<Vec<u8>>) -> &mut Self {
        self.add_parents(path);
        self.files.insert(path.to_string(), content.into());
        self
    }

    /// Create directory `path` and its parents.
    pub fn mkdir(&mut self, path: &str) -> &mut Self {
        self.add_parents(path);
        self.dirs.insert(path.to_string());
        self
    }

    /// Remove a file or a whole directory subtree.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        let prefix = format!("{}/", path);
        self.files
            .retain(|p, _| p != path && !p.starts_with(&prefix));
        self.dirs.retain(|d| d != path && !d.starts_with(&prefix));
        self
    }

    fn add_parents(&mut self, path: &str) {
        let mut parent = path;
        while let Some((head, _)) = parent.rsplit_once('/') {
            self.dirs.insert(head.to_string());
            parent = head;
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }
}

impl WorkTree for MemoryTree {
    fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        if !self.is_dir(dir) {
            return Err(Error::io(
                dir,
                io::Error::new(io::ErrorKind::NotFound, "no such directory"),
            ));
        }

        let mut children: BTreeMap<String, DirEntry> = BTreeMap::new();
        let direct_child = |path: &str| -> Option<String> {
            let rest = if dir.is_empty() {
                path
            } else {
                path.strip_prefix(dir)?.strip_prefix('/')?
            };
            if rest.is_empty() || rest.contains('/') {
                None
            } else {
                Some(rest.to_string())
            }
        };

        for path in self.files.keys() {
            if let Some(name) = direct_child(path) {
                children.insert(name.clone(), DirEntry::file(name));
            }
        }
        for path in &self.dirs {
            if let Some(name) = direct_child(path) {
                children.insert(name.clone(), DirEntry::dir(name));
            }
        }

        Ok(children.into_values().collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            Error::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tree_lists_sorted_children() {
        let mut tree = MemoryTree::new();
        tree.write("b.txt", "b").write("a/x.txt", "x").write("a/y/z.txt", "z");
        let root = tree.list_dir("").unwrap();
        assert_eq!(root, vec![DirEntry::dir("a"), DirEntry::file("b.txt")]);
        let a = tree.list_dir("a").unwrap();
        assert_eq!(a, vec![DirEntry::file("x.txt"), DirEntry::dir("y")]);
    }

    #[test]
    fn memory_tree_empty_dir_and_remove() {
        let mut tree = MemoryTree::new();
        tree.mkdir("empty").write("d/f", "1");
        assert!(tree.list_dir("empty").unwrap().is_empty());
        tree.remove("d");
        assert_eq!(tree.list_dir("").unwrap(), vec![DirEntry::dir("empty")]);
        assert!(tree.list_dir("d").is_err());
    }

    #[test]
    fn memory_tree_prefix_is_not_child() {
        let mut tree = MemoryTree::new();
        tree.write("ab/c", "1").write("a/d", "2");
        assert_eq!(tree.list_dir("a").unwrap(), vec![DirEntry::file("d")]);
    }

    #[test]
    fn disk_tree_lists_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/y.txt"), "why").unwrap();
        std::fs::write(dir.path().join("x.txt"), "ex").unwrap();

        let tree = DiskTree::new(dir.path());
        assert_eq!(
            tree.list_dir("").unwrap(),
            vec![DirEntry::dir("sub"), DirEntry::file("x.txt")]
        );
        assert_eq!(tree.read_file("sub/y.txt").unwrap(), b"why");
    }

    #[cfg(unix)]
    #[test]
    fn disk_tree_skips_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::fs::write(dir.path().join("real/f"), "f").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/f"), dir.path().join("link")).unwrap();

        let tree = DiskTree::new(dir.path());
        assert_eq!(
            tree.list_dir("").unwrap(),
            vec![DirEntry::file("link"), DirEntry::dir("real")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn disk_tree_skips_sockets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), "p").unwrap();
        let _listener =
            std::os::unix::net::UnixListener::bind(dir.path().join("daemon.sock")).unwrap();

        let tree = DiskTree::new(dir.path());
        assert_eq!(tree.list_dir("").unwrap(), vec![DirEntry::file("plain.txt")]);
    }
}
