use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Sequential index naming a stored tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(pub u64);

/// Sequential index naming a stored version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(pub u64);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash identifying a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two independently numbered object classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexClass {
    Tree,
    Version,
}

impl IndexClass {
    /// File name of the counter backing this class.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Version => "version",
        }
    }
}

// ---------------------------------------------------------------------------
// TreeEntry
// ---------------------------------------------------------------------------

/// One named reference inside a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Blob { fingerprint: Fingerprint, name: String },
    Tree { id: TreeId, name: String },
}

impl TreeEntry {
    pub fn blob(fingerprint: Fingerprint, name: impl Into<String>) -> Self {
        Self::Blob {
            fingerprint,
            name: name.into(),
        }
    }

    pub fn tree(id: TreeId, name: impl Into<String>) -> Self {
        Self::Tree {
            id,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Blob { name, .. } | Self::Tree { name, .. } => name,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree { .. })
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// A stored snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Previous version, `None` for the first one.
    pub parent: Option<VersionId>,
    pub tree: TreeId,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Working tree entries
// ---------------------------------------------------------------------------

/// Kind of an entry found in the working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
}

/// One child of a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

// ---------------------------------------------------------------------------
// StatusReport
// ---------------------------------------------------------------------------

/// Working-tree changes relative to the head version.
///
/// Paths are relative to the working root and `/`-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct StatusReport {
    pub new: Vec<String>,
    pub deleted: Vec<String>,
    pub modified: Vec<String>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when nothing differs from the head version.
    pub fn is_clean(&self) -> bool {
        self.new.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed paths.
    pub fn total(&self) -> usize {
        self.new.len() + self.deleted.len() + self.modified.len()
    }
}

// ---------------------------------------------------------------------------
// SaveOutcome
// ---------------------------------------------------------------------------

/// Result of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First version of the repository.
    Initial { version: VersionId, tree: TreeId },
    /// A new version on top of `parent`.
    Saved {
        version: VersionId,
        parent: VersionId,
        tree: TreeId,
    },
    /// The working tree matches `head`; nothing was written.
    NoChanges { head: VersionId },
}

impl SaveOutcome {
    /// The version head points at after the save.
    pub fn head(&self) -> VersionId {
        match *self {
            Self::Initial { version, .. } | Self::Saved { version, .. } => version,
            Self::NoChanges { head } => head,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, Self::NoChanges { .. })
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_META_DIR: &str = ".vsnap";
pub const DEFAULT_IGNORE_FILE: &str = ".vsnapignore";

/// Options for opening or creating a `Repository`.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Create the metadata directory if it doesn't exist.
    pub create: bool,
    /// Name of the head pointer.
    pub branch: String,
    /// Metadata directory name, relative to the working root.
    pub meta_dir: String,
    /// Ignore file name, relative to the working root.
    pub ignore_file: String,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create: false,
            branch: DEFAULT_BRANCH.into(),
            meta_dir: DEFAULT_META_DIR.into(),
            ignore_file: DEFAULT_IGNORE_FILE.into(),
        }
    }
}

/// Options for a single save.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Message for the new version; a generated one is used when `None`.
    pub message: Option<String>,
}
