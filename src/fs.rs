//! Filesystem access used by the spider.
//!
//! The walk never touches `std::fs` directly; it goes through [`FileSystem`] so
//! that trees which are hard to build on disk (unreadable directories when
//! running as root, entries that vanish mid-walk) can be substituted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The filesystem operations a walk needs.
///
/// `is_regular_file` and `is_directory` follow symlinks, so a dangling link is
/// neither and a link to a directory is a directory.
pub trait FileSystem {
    /// Lists the immediate children of `path` as full paths, in listing order.
    fn list_entries(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn is_regular_file(&self, path: &Path) -> bool;
    fn is_directory(&self, path: &Path) -> bool;
    /// Size in bytes. Fails if `path` vanished since it was listed.
    fn stat_size(&self, path: &Path) -> io::Result<u64>;
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn is_regular_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn stat_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
}
