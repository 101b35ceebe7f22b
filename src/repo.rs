use std::path::{Path, PathBuf};

use crate::chain::VersionChain;
use crate::error::{Error, Result};
use crate::ignore::IgnoreSet;
use crate::index::CounterFiles;
use crate::paths::validate_branch_name;
use crate::store::FileStore;
use crate::types::{OpenOptions, SaveOptions, SaveOutcome, StatusReport, Version, VersionId};
use crate::worktree::DiskTree;

/// A working directory plus its metadata directory on disk.
///
/// ```text
/// <root>/
///   .vsnapignore
///   .vsnap/
///     idx/{tree,version}
///     obj/{blob,tree,version}/
///     head/<branch>
/// ```
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    store: FileStore,
    counters: CounterFiles,
    options: OpenOptions,
}

impl Repository {
    /// Open the repository whose working root is `root`.
    ///
    /// With `options.create` a missing metadata directory is initialised
    /// (both counters at 0, no head); otherwise it must already exist.
    ///
    /// # Errors
    /// [`Error::Uninitialized`] if there is no metadata directory and
    /// `create` is false; [`Error::StorageUnavailable`] if the layout is
    /// incomplete or cannot be created.
    pub fn open(root: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        validate_branch_name(&options.branch)?;
        if options.meta_dir.is_empty() || options.meta_dir.contains(['/', '\\']) {
            return Err(Error::invalid_name(format!(
                "metadata directory must be a plain name, got {:?}",
                options.meta_dir
            )));
        }

        let meta = root.join(&options.meta_dir);
        let idx = meta.join("idx");

        let (store, counters) = if meta.is_dir() {
            let store = FileStore::new(&meta);
            store.validate()?;
            (store, CounterFiles::new(idx))
        } else if options.create {
            log::info!("initialising repository in {}", meta.display());
            (FileStore::init(&meta)?, CounterFiles::init(idx)?)
        } else {
            return Err(Error::uninitialized(&root));
        };

        Ok(Self {
            root,
            store,
            counters,
            options,
        })
    }

    /// Create a repository at `root`, failing if one already exists.
    pub fn init(root: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        let meta = root.as_ref().join(&options.meta_dir);
        if meta.exists() {
            return Err(Error::storage_msg(format!(
                "repository already initialised at {}",
                meta.display()
            )));
        }
        Self::open(
            root,
            OpenOptions {
                create: true,
                ..options
            },
        )
    }

    /// Working root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata directory.
    pub fn meta_dir(&self) -> &Path {
        self.store.meta_dir()
    }

    pub fn branch(&self) -> &str {
        &self.options.branch
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn counters(&self) -> &CounterFiles {
        &self.counters
    }

    /// Load the ignore file. The metadata directory is always ignored.
    pub fn load_ignores(&self) -> Result<IgnoreSet> {
        let mut ignores = IgnoreSet::new();
        ignores.insert(&self.options.meta_dir);
        ignores.load_from_file(&self.root.join(&self.options.ignore_file))?;
        Ok(ignores)
    }

    /// The version chain of the configured branch.
    pub fn chain(&self) -> Result<VersionChain<'_>> {
        VersionChain::new(&self.store, &self.counters, self.options.branch.as_str())
    }

    fn worktree(&self) -> DiskTree {
        DiskTree::new(&self.root)
    }

    /// Snapshot the working root; see [`VersionChain::save`].
    pub fn save(&self, options: &SaveOptions) -> Result<SaveOutcome> {
        let ignores = self.load_ignores()?;
        self.chain()?.save(&self.worktree(), &ignores, options)
    }

    /// Classify the working root against the head version.
    pub fn status(&self) -> Result<StatusReport> {
        let ignores = self.load_ignores()?;
        self.chain()?.status(&self.worktree(), &ignores)
    }

    /// `true` if a save would record anything.
    pub fn has_pending_changes(&self) -> Result<bool> {
        let ignores = self.load_ignores()?;
        self.chain()?.has_pending_changes(&self.worktree(), &ignores)
    }

    pub fn head(&self) -> Result<Option<VersionId>> {
        self.chain()?.head()
    }

    /// Versions from the head back to the first, newest first.
    pub fn history(&self) -> Result<Vec<(VersionId, Version)>> {
        self.chain()?.history()
    }

    /// Check that every tree reachable from the head exists.
    pub fn verify(&self) -> Result<usize> {
        self.chain()?.verify()
    }
}
