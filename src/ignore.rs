//! Names excluded from every traversal of the working tree.
//!
//! An [`IgnoreSet`] is matched against the bare file name of each entry,
//! never against its path, so `build` hides every directory or file called
//! `build` at any depth. Names containing `*` or `?` are treated as
//! wildcard patterns; everything else must match exactly.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::glob::{has_wildcard, name_matches};

/// Set of file names that the snapshot engine never looks at.
///
/// # Example
///
/// ```rust
/// use vsnap::IgnoreSet;
///
/// let mut ignores = IgnoreSet::new();
/// ignores.add_names(&["target", "*.log"]);
///
/// assert!(ignores.is_ignored("target"));
/// assert!(ignores.is_ignored("debug.log"));
/// assert!(!ignores.is_ignored("main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    exact: BTreeSet<String>,
    patterns: Vec<String>,
}

impl IgnoreSet {
    /// Create an empty set that ignores nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one name or wildcard pattern.
    ///
    /// Surrounding whitespace is trimmed; blank entries and entries starting
    /// with `#` are skipped.
    pub fn insert(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        if has_wildcard(trimmed) {
            if !self.patterns.iter().any(|p| p == trimmed) {
                self.patterns.push(trimmed.to_string());
            }
        } else {
            self.exact.insert(trimmed.to_string());
        }
    }

    /// Add several names at once.
    pub fn add_names(&mut self, names: &[&str]) {
        for &name in names {
            self.insert(name);
        }
    }

    /// Load names from a file, one per line.
    ///
    /// A missing file leaves the set unchanged and is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        for line in contents.lines() {
            self.insert(line);
        }
        log::debug!("loaded {} ignore entries from {}", self.len(), path.display());
        Ok(())
    }

    /// Return `true` if an entry called `name` must be skipped.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|p| name_matches(p, name))
    }

    /// Number of names and patterns in the set.
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
