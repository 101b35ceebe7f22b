//! Monotonic index counters naming trees and versions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::record;
use crate::store::write_atomic;
use crate::types::IndexClass;

/// Hands out unique, increasing indices per [`IndexClass`].
pub trait IndexAllocator {
    /// Return the next free index for `class` and advance the counter.
    ///
    /// The advanced counter is persisted before the index is returned, so
    /// an index is never handed out twice. Interrupted callers may leave
    /// gaps; indices are unique, not contiguous.
    ///
    /// # Errors
    /// Returns [`Error::StorageUnavailable`] if the counter cannot be read
    /// or written.
    fn next_index(&self, class: IndexClass) -> Result<u64>;
}

impl<A: IndexAllocator + ?Sized> IndexAllocator for &A {
    fn next_index(&self, class: IndexClass) -> Result<u64> {
        (**self).next_index(class)
    }
}

// ---------------------------------------------------------------------------
// CounterFiles
// ---------------------------------------------------------------------------

/// Counters stored as one decimal file per class under `<meta>/idx/`.
#[derive(Debug, Clone)]
pub struct CounterFiles {
    dir: PathBuf,
}

impl CounterFiles {
    /// Use the counters in `dir` (normally `<meta>/idx`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create `dir` and start every counter at 0.
    pub fn init(dir: impl Into<PathBuf>) -> Result<Self> {
        let counters = Self::new(dir);
        std::fs::create_dir_all(&counters.dir).map_err(|e| Error::storage(&counters.dir, e))?;
        for class in [IndexClass::Tree, IndexClass::Version] {
            write_atomic(&counters.path(class), b"0")?;
        }
        Ok(counters)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, class: IndexClass) -> PathBuf {
        self.dir.join(class.name())
    }

    /// Read the next free index for `class` without advancing it.
    pub fn peek(&self, class: IndexClass) -> Result<u64> {
        let path = self.path(class);
        let text = std::fs::read_to_string(&path).map_err(|e| Error::storage(&path, e))?;
        record::parse_index(class.name(), &text).map_err(|_| {
            Error::storage_msg(format!(
                "{}: counter does not hold an index",
                path.display()
            ))
        })
    }
}

impl IndexAllocator for CounterFiles {
    fn next_index(&self, class: IndexClass) -> Result<u64> {
        let index = self.peek(class)?;
        let next = index
            .checked_add(1)
            .ok_or_else(|| Error::storage_msg(format!("{} counter exhausted", class.name())))?;
        write_atomic(&self.path(class), next.to_string().as_bytes())?;
        log::debug!("allocated {} index {}", class.name(), index);
        Ok(index)
    }
}

// ---------------------------------------------------------------------------
// MemoryCounters
// ---------------------------------------------------------------------------

/// In-process counters, starting at 0. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryCounters {
    next: Mutex<[u64; 2]>,
}

impl MemoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(class: IndexClass) -> usize {
        match class {
            IndexClass::Tree => 0,
            IndexClass::Version => 1,
        }
    }

    /// Read the next free index for `class` without advancing it.
    pub fn peek(&self, class: IndexClass) -> u64 {
        match self.next.lock() {
            Ok(next) => next[Self::slot(class)],
            Err(poisoned) => poisoned.into_inner()[Self::slot(class)],
        }
    }
}

impl IndexAllocator for MemoryCounters {
    fn next_index(&self, class: IndexClass) -> Result<u64> {
        let mut next = self
            .next
            .lock()
            .map_err(|e| Error::storage_msg(e.to_string()))?;
        let slot = &mut next[Self::slot(class)];
        let index = *slot;
        *slot += 1;
        Ok(index)
    }
}
