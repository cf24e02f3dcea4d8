//! # Photobase
//!
//! `photobase` walks a directory tree, classifies every regular file by its
//! content, and records structured metadata for the types it understands
//! (JPEG today). It is meant for keeping an inventory of a photo backup.
//!
//! The walk and the classification are separate layers. [`Spider`] is a
//! generic depth-first walker that calls a [`Visitor`] at every file and
//! directory. [`PhotoSpider`] plugs in a [`PhotoClassifier`], which sniffs each
//! file's type with a [`MagicSession`], routes it through a
//! [`HandlerRegistry`], and passes the resulting [`Record`] to a
//! [`MetadataStore`].
//!
//! # Features
//!
//! - `parallel`: classifies files on a Rayon pool in [`inventory`].
//!
//! # Example
//!
//! ```no_run
//! use photobase::{FailurePolicy, PhotoSpider, SpiderBuilder};
//!
//! let options = SpiderBuilder::new("/srv/photos")
//!     .failure_policy(FailurePolicy::Isolate)
//!     .ignore_patterns(vec!["**/.thumbnails/**".into()])
//!     .build();
//!
//! let mut spider = PhotoSpider::open_with(options).expect("Failed to open sniffer");
//! spider.spider_root().expect("Failed to walk photo root");
//! println!("{} files processed", spider.file_count());
//! ```

mod error;
mod fs;
pub mod handlers;
mod inventory;
mod options;
mod photo;
mod record;
mod sniff;
mod spider;
pub mod store;

pub use error::{SnifferError, SpiderError};
pub use fs::{FileSystem, OsFileSystem};
pub use handlers::{ContentHandler, HandlerRegistry, JpegHandler, TypeMatcher};
pub use inventory::{inventory, inventory_with};
pub use options::{FailurePolicy, SpiderBuilder, SpiderOptions};
pub use photo::{PhotoClassifier, PhotoSpider};
pub use record::{FILE_SIZE, FILE_TYPE, FieldValue, FileRecord, Inventory, Record};
pub use sniff::{MagicSession, TypeSniffer};
pub use spider::{LogVisitor, Spider, Visitor};
pub use store::{JsonLinesStore, LogStore, MemoryStore, MetadataStore};
