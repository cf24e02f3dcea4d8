//! Content classification on top of the generic spider.

use crate::error::SpiderError;
use crate::fs::{FileSystem, OsFileSystem};
use crate::handlers::HandlerRegistry;
use crate::options::{SpiderBuilder, SpiderOptions};
use crate::record::{FILE_SIZE, FILE_TYPE, Record};
use crate::sniff::{MagicSession, TypeSniffer};
use crate::spider::{Spider, Visitor};
use crate::store::{LogStore, MetadataStore};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A [`Spider`] whose file hook classifies content and records metadata.
pub type PhotoSpider<S = LogStore, F = OsFileSystem> = Spider<PhotoClassifier<S>, F>;

impl Spider<PhotoClassifier<LogStore>, OsFileSystem> {
    /// Opens a type-sniffing session and prepares a walk of `root` that logs
    /// each record.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SpiderError> {
        Self::with_visitor(SpiderBuilder::new(root).build(), PhotoClassifier::open()?)
    }

    /// Like [`PhotoSpider::open`] with explicit options.
    pub fn open_with(options: SpiderOptions) -> Result<Self, SpiderError> {
        Self::with_visitor(options, PhotoClassifier::open()?)
    }
}

/// Sniffs each file, stats it, and hands the type-specific fields to a store.
pub struct PhotoClassifier<S = LogStore> {
    sniffer: Box<dyn TypeSniffer>,
    handlers: HandlerRegistry,
    store: S,
}

impl PhotoClassifier<LogStore> {
    /// Classifier backed by a freshly loaded [`MagicSession`], the built-in
    /// handlers, and a [`LogStore`].
    pub fn open() -> Result<Self, SpiderError> {
        let mut session = MagicSession::open();
        session.load().map_err(SpiderError::SnifferLoad)?;
        Ok(Self::new(session))
    }

    pub fn new(sniffer: impl TypeSniffer + 'static) -> Self {
        Self {
            sniffer: Box::new(sniffer),
            handlers: HandlerRegistry::with_defaults(),
            store: LogStore,
        }
    }
}

impl<S> PhotoClassifier<S> {
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_store<T: MetadataStore>(self, store: T) -> PhotoClassifier<T> {
        PhotoClassifier {
            sniffer: self.sniffer,
            handlers: self.handlers,
            store,
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Builds the record for one file without storing it.
    ///
    /// The record always carries [`FILE_TYPE`] and [`FILE_SIZE`]; a handler
    /// matching the sniffed type adds fields and may overwrite those two.
    pub fn classify(&self, path: &Path, fs: &dyn FileSystem) -> Result<Record, SpiderError> {
        let mut record = Record::new();
        let file_type = self
            .sniffer
            .classify(path)
            .map_err(|source| SpiderError::Sniff {
                path: path.to_path_buf(),
                source,
            })?;
        let size = fs.stat_size(path).map_err(|e| SpiderError::stat(path, e))?;
        record.insert(FILE_TYPE, file_type.as_str());
        record.insert(FILE_SIZE, size);
        match self.handlers.dispatch(&file_type) {
            Some(handler) => record.merge(handler.extract(path)),
            None => warn!("Don't know how to handle type: {}", file_type),
        }
        Ok(record)
    }
}

impl<S: MetadataStore> Visitor for PhotoClassifier<S> {
    fn visit_file(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<(), SpiderError> {
        info!("Processing {}", path.display());
        let record = self.classify(path, fs)?;
        self.store.store(path, &record)
    }
}
