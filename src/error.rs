use std::path::PathBuf;

/// All errors produced by vsnap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("corrupt object: {0}")]
    CorruptObject(String),

    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("could not read head '{branch}': {source}")]
    HeadUnreadable {
        branch: String,
        #[source]
        source: Box<Error>,
    },

    #[error("could not read version object {id}: {source}")]
    VersionUnreadable {
        id: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("repository uninitialized: {0}")]
    Uninitialized(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn storage(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::StorageUnavailable(format!("{}: {}", path.into().display(), err))
    }

    pub fn storage_msg(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptObject(msg.into())
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingReference(what.into())
    }

    pub fn uninitialized(path: impl Into<PathBuf>) -> Self {
        Self::Uninitialized(path.into().display().to_string())
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }

    pub(crate) fn head_unreadable(branch: &str, source: Error) -> Self {
        Self::HeadUnreadable {
            branch: branch.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn version_unreadable(id: u64, source: Error) -> Self {
        Self::VersionUnreadable {
            id,
            source: Box::new(source),
        }
    }

    /// `true` when the repository holds an object that cannot be trusted
    /// and the user has to repair it before saving again.
    pub fn needs_recovery(&self) -> bool {
        matches!(
            self,
            Self::CorruptObject(_)
                | Self::MissingReference(_)
                | Self::HeadUnreadable { .. }
                | Self::VersionUnreadable { .. }
        )
    }
}
