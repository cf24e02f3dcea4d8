use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("cannot list directory {path}: {source}")]
    DirectoryAccess {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot sniff {path}: {source}")]
    Sniff {
        path: PathBuf,
        source: SnifferError,
    },
    #[error("cannot load type sniffer: {0}")]
    SnifferLoad(SnifferError),
    #[error("Invalid ignore pattern: {0}")]
    InvalidPattern(String),
    #[error("Metadata store failed: {0}")]
    Store(String),
}
impl SpiderError {
    pub(crate) fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpiderError::DirectoryAccess {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpiderError::Stat {
            path: path.into(),
            source,
        }
    }
    /// Whether this error came from listing a directory.
    pub fn is_directory_access(&self) -> bool {
        matches!(self, SpiderError::DirectoryAccess { .. })
    }
}
#[derive(Debug, Error)]
pub enum SnifferError {
    #[error("magic database not loaded")]
    NotLoaded,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
impl SnifferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnifferError::Io {
            path: path.into(),
            source,
        }
    }
}
