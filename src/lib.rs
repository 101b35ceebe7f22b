//! Snapshot engine for a small, single-line version-control tool.
//!
//! `vsnap` records a directory tree as immutable objects: content-addressed
//! **blobs** for file contents, index-named **trees** for directories, and
//! **versions** that link a root tree to the previous version. Each save
//! compares the working tree with the head version and writes only what
//! changed; unchanged subtrees keep their existing tree ids.
//!
//! # Key types
//!
//! - [`Repository`]: a working root with its `.vsnap` metadata directory;
//!   the entry point for `save`, `status` and `history`.
//! - [`VersionChain`]: decides whether a save needs a new version and
//!   moves the head.
//! - [`Snapshotter`]: the recursive materializer / differ / status walk.
//! - [`ObjectStore`], [`IndexAllocator`], [`WorkTree`]: the seams the
//!   engine works through, with on-disk and in-memory implementations.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use vsnap::{OpenOptions, Repository, SaveOptions};
//!
//! let repo = Repository::open("/tmp/project", OpenOptions {
//!     create: true,
//!     ..Default::default()
//! }).unwrap();
//!
//! let outcome = repo.save(&SaveOptions::default()).unwrap();
//! println!("head is now version {}", outcome.head());
//!
//! let status = repo.status().unwrap();
//! assert!(status.is_clean());
//! ```

pub mod chain;
pub mod error;
pub mod glob;
pub mod ignore;
pub mod index;
pub mod memory;
pub mod paths;
pub mod record;
pub mod repo;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod worktree;

// Re-export primary public types at crate root.
pub use chain::VersionChain;
pub use error::{Error, Result};
pub use ignore::IgnoreSet;
pub use index::{CounterFiles, IndexAllocator, MemoryCounters};
pub use memory::MemoryStore;
pub use repo::Repository;
pub use snapshot::Snapshotter;
pub use store::{FileStore, ObjectStore};
pub use types::*;
pub use worktree::{DiskTree, MemoryTree, WorkTree};
