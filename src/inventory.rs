use crate::error::SpiderError;
use crate::fs::{FileSystem, OsFileSystem};
use crate::options::{FailurePolicy, SpiderOptions};
use crate::photo::PhotoClassifier;
use crate::record::{FileRecord, Inventory, Record};
use crate::spider::{LogVisitor, Spider};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, error};

/// Walks `options.root` and classifies every regular file found.
pub fn inventory(options: SpiderOptions) -> Result<Inventory, SpiderError> {
    let classifier = PhotoClassifier::open()?;
    inventory_with(options, &classifier, OsFileSystem)
}

/// [`inventory`] with a caller-supplied classifier and filesystem.
///
/// The walk is sequential. Classification runs on the rayon pool when the
/// `parallel` feature is enabled; records come back in traversal order either way.
pub fn inventory_with<S, F>(
    options: SpiderOptions,
    classifier: &PhotoClassifier<S>,
    fs: F,
) -> Result<Inventory, SpiderError>
where
    S: Sync,
    F: FileSystem + Sync,
{
    debug!("Starting inventory with root: {}", options.root.display());
    let mut spider = Spider::with_fs(options, LogVisitor, fs)?;
    spider.spider_root()?;
    #[cfg(not(feature = "parallel"))]
    let outcomes = classify_files(spider.files(), classifier, spider.file_system());
    #[cfg(feature = "parallel")]
    let outcomes = classify_files_parallel(spider.files(), classifier, spider.file_system());

    let mut failures = spider.failures().to_vec();
    let mut files = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        match (outcome, spider.options().failure_policy) {
            (Ok(record), _) => files.push(FileRecord { path, record }),
            (Err(err), FailurePolicy::Strict) => return Err(err),
            (Err(err), FailurePolicy::Isolate) => {
                error!("Skipping {}: {}", path.display(), err);
                failures.push((path, err.to_string()));
            }
        }
    }
    Ok(Inventory {
        root: spider.root().to_path_buf(),
        directories: spider.directories().to_vec(),
        failures,
        files,
    })
}

#[cfg(not(feature = "parallel"))]
fn classify_files<S, F: FileSystem>(
    paths: &[PathBuf],
    classifier: &PhotoClassifier<S>,
    fs: &F,
) -> Vec<(PathBuf, Result<Record, SpiderError>)> {
    paths
        .iter()
        .map(|path| (path.clone(), classifier.classify(path, fs)))
        .collect()
}

#[cfg(feature = "parallel")]
fn classify_files_parallel<S: Sync, F: FileSystem + Sync>(
    paths: &[PathBuf],
    classifier: &PhotoClassifier<S>,
    fs: &F,
) -> Vec<(PathBuf, Result<Record, SpiderError>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), classifier.classify(path, fs)))
        .collect()
}
