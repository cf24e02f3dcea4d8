//! The generic tree walker.
//!
//! A [`Spider`] walks a directory tree depth-first and pre-order, records every
//! regular file and directory it meets, and calls a [`Visitor`] at each of them.
//! The visitor is where per-node behavior lives; the walk itself knows nothing
//! about file contents.

use crate::error::SpiderError;
use crate::fs::{FileSystem, OsFileSystem};
use crate::options::{FailurePolicy, SpiderBuilder, SpiderOptions};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::vec::IntoIter;
use tracing::{debug, error, info};

/// Per-node hooks invoked by a [`Spider`].
///
/// Both hooks are called exactly once per node. `visit_directory` fires before
/// the directory's children are listed.
pub trait Visitor {
    fn visit_directory(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<(), SpiderError> {
        let _ = (path, fs);
        Ok(())
    }

    fn visit_file(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<(), SpiderError> {
        let _ = fs;
        info!("Found file {}", path.display());
        Ok(())
    }
}

/// The default visitor: announces files, ignores directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogVisitor;

impl Visitor for LogVisitor {}

/// Depth-first, pre-order directory walker.
///
/// Discovered paths accumulate across calls to [`Spider::spider`]; walking the
/// same root twice records every path twice unless [`Spider::reset`] is called
/// in between.
pub struct Spider<V = LogVisitor, F = OsFileSystem> {
    options: SpiderOptions,
    matcher: Option<GlobSet>,
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
    failures: Vec<(PathBuf, String)>,
    visitor: V,
    fs: F,
}

impl Spider<LogVisitor, OsFileSystem> {
    /// A spider over the real filesystem with default options.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::assemble(SpiderBuilder::new(root).build(), None, LogVisitor, OsFileSystem)
    }
}

impl<V: Visitor> Spider<V, OsFileSystem> {
    pub fn with_visitor(options: SpiderOptions, visitor: V) -> Result<Self, SpiderError> {
        Self::with_fs(options, visitor, OsFileSystem)
    }
}

impl<V, F> Spider<V, F> {
    fn assemble(options: SpiderOptions, matcher: Option<GlobSet>, visitor: V, fs: F) -> Self {
        Self {
            options,
            matcher,
            files: Vec::new(),
            directories: Vec::new(),
            failures: Vec::new(),
            visitor,
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    pub fn options(&self) -> &SpiderOptions {
        &self.options
    }

    /// Number of regular files recorded so far.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Paths skipped under [`FailurePolicy::Isolate`], with the error message.
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failures
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    pub fn into_visitor(self) -> V {
        self.visitor
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Forgets everything recorded by earlier walks.
    pub fn reset(&mut self) {
        self.files.clear();
        self.directories.clear();
        self.failures.clear();
    }
}

impl<V: Visitor, F: FileSystem> Spider<V, F> {
    pub fn with_fs(options: SpiderOptions, visitor: V, fs: F) -> Result<Self, SpiderError> {
        let matcher = compile_patterns(&options.ignore_patterns)?;
        Ok(Self::assemble(options, matcher, visitor, fs))
    }

    /// Walks the root given at construction.
    pub fn spider_root(&mut self) -> Result<(), SpiderError> {
        let root = self.options.root.clone();
        self.spider(root)
    }

    /// Walks the tree under `path`.
    ///
    /// Fails if `path` itself cannot be listed. What happens when a nested
    /// directory cannot be listed, or a visit hook fails, is decided by the
    /// configured [`FailurePolicy`]. Entries that are neither a regular file
    /// nor a directory are logged and skipped.
    pub fn spider(&mut self, path: impl AsRef<Path>) -> Result<(), SpiderError> {
        let path = path.as_ref();
        let entries = self.list(path)?;
        if self.options.max_depth == Some(0) {
            debug!("max depth reached at {}", path.display());
            return Ok(());
        }
        // One pending-children iterator per open directory, with the depth of
        // those children.
        let mut stack: Vec<(IntoIter<PathBuf>, usize)> = vec![(entries.into_iter(), 1)];
        loop {
            let Some((pending, depth)) = stack.last_mut() else {
                break;
            };
            let depth = *depth;
            let Some(entry) = pending.next() else {
                stack.pop();
                continue;
            };
            if self.is_ignored(&entry) {
                debug!("ignoring {}", entry.display());
                continue;
            }
            if self.fs.is_regular_file(&entry) {
                self.files.push(entry.clone());
                let outcome = self.visitor.visit_file(&entry, &self.fs);
                self.settle(&entry, outcome)?;
            } else if self.fs.is_directory(&entry) {
                self.directories.push(entry.clone());
                if let Err(err) = self.visitor.visit_directory(&entry, &self.fs) {
                    self.settle(&entry, Err(err))?;
                    continue;
                }
                if self.options.max_depth.is_some_and(|max| depth >= max) {
                    debug!("max depth reached at {}", entry.display());
                    continue;
                }
                match self.list(&entry) {
                    Ok(children) => stack.push((children.into_iter(), depth + 1)),
                    Err(err) => self.settle(&entry, Err(err))?,
                }
            } else {
                error!("Don't know how to process {}", entry.display());
            }
        }
        Ok(())
    }

    fn list(&self, path: &Path) -> Result<Vec<PathBuf>, SpiderError> {
        let entries = self
            .fs
            .list_entries(path)
            .map_err(|e| SpiderError::directory(path, e))?;
        debug!("visiting path {} found {} entries", path.display(), entries.len());
        Ok(entries)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.matcher.as_ref().is_some_and(|m| m.is_match(path))
    }

    fn settle(&mut self, path: &Path, outcome: Result<(), SpiderError>) -> Result<(), SpiderError> {
        match (outcome, self.options.failure_policy) {
            (Ok(()), _) => Ok(()),
            (Err(err), FailurePolicy::Strict) => Err(err),
            (Err(err), FailurePolicy::Isolate) => {
                error!("Skipping {}: {}", path.display(), err);
                self.failures.push((path.to_path_buf(), err.to_string()));
                Ok(())
            }
        }
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Option<GlobSet>, SpiderError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            SpiderError::InvalidPattern(format!("Invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| SpiderError::InvalidPattern(format!("Failed to build glob set: {}", e)))?;
    Ok(Some(set))
}
