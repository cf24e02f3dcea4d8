use photobase::{
    ContentHandler, FILE_SIZE, FILE_TYPE, FailurePolicy, FileSystem, HandlerRegistry,
    MemoryStore, PhotoClassifier, Record, SnifferError, Spider, SpiderBuilder, SpiderError,
    TypeMatcher, TypeSniffer, Visitor, inventory_with,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory tree. Listing order is insertion order.
#[derive(Default)]
struct MemFs {
    dirs: HashMap<PathBuf, Vec<PathBuf>>,
    files: HashMap<PathBuf, u64>,
    unreadable: HashSet<PathBuf>,
    vanished: HashSet<PathBuf>,
}

impl MemFs {
    fn new(root: &str) -> Self {
        let mut fs = Self::default();
        fs.dirs.insert(PathBuf::from(root), Vec::new());
        fs
    }
    fn link(&mut self, path: &Path) {
        if let Some(children) = path.parent().and_then(|p| self.dirs.get_mut(p)) {
            children.push(path.to_path_buf());
        }
    }
    fn dir(mut self, path: &str) -> Self {
        let path = PathBuf::from(path);
        self.link(&path);
        self.dirs.insert(path, Vec::new());
        self
    }
    fn file(mut self, path: &str, size: u64) -> Self {
        let path = PathBuf::from(path);
        self.link(&path);
        self.files.insert(path, size);
        self
    }
    /// An entry that is neither a file nor a directory.
    fn special(mut self, path: &str) -> Self {
        self.link(Path::new(path));
        self
    }
    fn unreadable(mut self, path: &str) -> Self {
        self = self.dir(path);
        self.unreadable.insert(PathBuf::from(path));
        self
    }
    fn vanishing(mut self, path: &str, size: u64) -> Self {
        self = self.file(path, size);
        self.vanished.insert(PathBuf::from(path));
        self
    }
}

impl FileSystem for MemFs {
    fn list_entries(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such directory"))
    }
    fn is_regular_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
    fn is_directory(&self, path: &Path) -> bool {
        self.dirs.contains_key(path)
    }
    fn stat_size(&self, path: &Path) -> io::Result<u64> {
        if self.vanished.contains(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "vanished"));
        }
        self.files
            .get(path)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

#[derive(Default)]
struct Trace {
    events: Vec<String>,
}

impl Visitor for Trace {
    fn visit_directory(&mut self, path: &Path, _fs: &dyn FileSystem) -> Result<(), SpiderError> {
        self.events.push(format!("dir {}", path.display()));
        Ok(())
    }
    fn visit_file(&mut self, path: &Path, _fs: &dyn FileSystem) -> Result<(), SpiderError> {
        self.events.push(format!("file {}", path.display()));
        Ok(())
    }
}

/// Sniffer answering from a fixed table; anything else is "data".
struct Scripted(HashMap<PathBuf, &'static str>);

impl Scripted {
    fn new(entries: &[(&str, &'static str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(path, label)| (PathBuf::from(path), *label))
                .collect(),
        )
    }
}

impl TypeSniffer for Scripted {
    fn classify(&self, path: &Path) -> Result<String, SnifferError> {
        Ok(self.0.get(path).copied().unwrap_or("data").to_string())
    }
}

/// Shared buffer the test subscriber formats events into.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns the formatted lines.
fn logged<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let sink = Captured::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    (out, text.lines().map(str::to_string).collect())
}

fn has_event(lines: &[String], level: &str, message: &str) -> bool {
    lines
        .iter()
        .any(|line| line.split_whitespace().next() == Some(level) && line.contains(message))
}

fn paths(list: &[PathBuf]) -> Vec<String> {
    list.iter().map(|p| p.display().to_string()).collect()
}

fn nested() -> MemFs {
    MemFs::new("/r")
        .file("/r/a.txt", 1)
        .dir("/r/sub")
        .file("/r/sub/x.jpg", 2)
        .dir("/r/sub/deep")
        .file("/r/sub/deep/y", 3)
        .file("/r/b.txt", 4)
}

#[test]
fn test_walk_is_depth_first_pre_order() {
    let mut spider =
        Spider::with_fs(SpiderBuilder::new("/r").build(), Trace::default(), nested()).unwrap();
    spider.spider_root().unwrap();
    assert_eq!(
        spider.visitor().events,
        vec![
            "file /r/a.txt",
            "dir /r/sub",
            "file /r/sub/x.jpg",
            "dir /r/sub/deep",
            "file /r/sub/deep/y",
            "file /r/b.txt",
        ]
    );
    assert_eq!(spider.file_count(), 4);
    assert_eq!(
        paths(spider.files()),
        vec!["/r/a.txt", "/r/sub/x.jpg", "/r/sub/deep/y", "/r/b.txt"]
    );
    assert_eq!(paths(spider.directories()), vec!["/r/sub", "/r/sub/deep"]);
    assert!(spider.failures().is_empty());
}

#[test]
fn test_files_and_directories_are_disjoint_and_well_classified() {
    let fs = nested().special("/r/socket");
    let mut spider = Spider::with_fs(SpiderBuilder::new("/r").build(), Trace::default(), fs).unwrap();
    spider.spider_root().unwrap();
    let fs = spider.file_system();
    for file in spider.files() {
        assert!(fs.is_regular_file(file));
        assert!(!spider.directories().contains(file));
    }
    for dir in spider.directories() {
        assert!(fs.is_directory(dir));
    }
}

#[test]
fn test_special_entries_are_skipped() {
    let fs = MemFs::new("/r")
        .special("/r/dangling")
        .file("/r/after", 1);
    let mut spider = Spider::with_fs(SpiderBuilder::new("/r").build(), Trace::default(), fs).unwrap();
    let (result, lines) = logged(|| spider.spider_root());
    result.unwrap();
    assert!(has_event(&lines, "ERROR", "Don't know how to process /r/dangling"));
    assert_eq!(spider.visitor().events, vec!["file /r/after"]);
    assert_eq!(spider.file_count(), 1);
    assert!(spider.directories().is_empty());
}

#[test]
fn test_unreadable_root_is_an_error() {
    let fs = MemFs::new("/r").unreadable("/r/locked");
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r/locked")
            .failure_policy(FailurePolicy::Isolate)
            .build(),
        Trace::default(),
        fs,
    )
    .unwrap();
    let err = spider.spider_root().unwrap_err();
    assert!(err.is_directory_access());
    assert!(spider.visitor().events.is_empty());

    let err = spider.spider("/missing").unwrap_err();
    assert!(matches!(err, SpiderError::DirectoryAccess { ref path, .. } if path == Path::new("/missing")));
}

fn with_locked_middle() -> MemFs {
    MemFs::new("/r")
        .file("/r/a", 1)
        .unreadable("/r/locked")
        .file("/r/z", 1)
}

#[test]
fn test_strict_policy_aborts_on_nested_failure() {
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r").build(),
        Trace::default(),
        with_locked_middle(),
    )
    .unwrap();
    let err = spider.spider_root().unwrap_err();
    assert!(matches!(err, SpiderError::DirectoryAccess { ref path, .. } if path == Path::new("/r/locked")));
    assert_eq!(spider.visitor().events, vec!["file /r/a", "dir /r/locked"]);
    assert_eq!(paths(spider.files()), vec!["/r/a"]);
}

#[test]
fn test_isolate_policy_continues_past_failed_subtree() {
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r")
            .failure_policy(FailurePolicy::Isolate)
            .build(),
        Trace::default(),
        with_locked_middle(),
    )
    .unwrap();
    spider.spider_root().unwrap();
    assert_eq!(paths(spider.files()), vec!["/r/a", "/r/z"]);
    assert_eq!(paths(spider.directories()), vec!["/r/locked"]);
    assert_eq!(spider.failures().len(), 1);
    assert_eq!(spider.failures()[0].0, PathBuf::from("/r/locked"));
}

#[test]
fn test_rewalk_accumulates_until_reset() {
    let mut spider =
        Spider::with_fs(SpiderBuilder::new("/r").build(), Trace::default(), nested()).unwrap();
    spider.spider_root().unwrap();
    spider.spider_root().unwrap();
    assert_eq!(spider.file_count(), 8);
    assert_eq!(spider.directories().len(), 4);
    spider.reset();
    assert_eq!(spider.file_count(), 0);
    spider.spider_root().unwrap();
    assert_eq!(spider.file_count(), 4);
}

#[test]
fn test_max_depth_records_but_does_not_descend() {
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r").max_depth(1).build(),
        Trace::default(),
        nested(),
    )
    .unwrap();
    spider.spider_root().unwrap();
    assert_eq!(paths(spider.files()), vec!["/r/a.txt", "/r/b.txt"]);
    assert_eq!(paths(spider.directories()), vec!["/r/sub"]);
}

#[test]
fn test_max_depth_zero() {
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r").max_depth(0).build(),
        Trace::default(),
        nested(),
    )
    .unwrap();
    spider.spider_root().unwrap();
    assert_eq!(spider.file_count(), 0);
    assert!(spider.directories().is_empty());
    assert!(spider.visitor().events.is_empty());

    let fs = MemFs::new("/r").unreadable("/r/locked");
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r/locked").max_depth(0).build(),
        Trace::default(),
        fs,
    )
    .unwrap();
    assert!(spider.spider_root().unwrap_err().is_directory_access());
}

#[test]
fn test_ignore_patterns() {
    let fs = MemFs::new("/r")
        .file("/r/a.txt", 1)
        .file("/r/b.log", 1)
        .dir("/r/.thumbnails")
        .file("/r/.thumbnails/t.jpg", 1);
    let mut spider = Spider::with_fs(
        SpiderBuilder::new("/r")
            .ignore_patterns(vec!["*.log".into(), "**/.thumbnails".into()])
            .build(),
        Trace::default(),
        fs,
    )
    .unwrap();
    spider.spider_root().unwrap();
    assert_eq!(paths(spider.files()), vec!["/r/a.txt"]);
    assert!(spider.directories().is_empty());
}

#[test]
fn test_invalid_ignore_pattern() {
    let result = Spider::with_fs(
        SpiderBuilder::new("/r")
            .ignore_patterns(vec!["a[".into()])
            .build(),
        Trace::default(),
        MemFs::new("/r"),
    );
    assert!(matches!(result, Err(SpiderError::InvalidPattern(_))));
}

fn photo_fs() -> MemFs {
    MemFs::new("/r")
        .file("/r/photo.txt", 2048)
        .file("/r/notes.md", 10)
        .vanishing("/r/gone.jpg", 5)
}

fn photo_sniffer() -> Scripted {
    Scripted::new(&[
        ("/r/photo.txt", "JPEG image data, JFIF standard 1.01"),
        ("/r/notes.md", "ASCII text"),
        ("/r/gone.jpg", "JPEG image data"),
    ])
}

#[test]
fn test_classifier_dispatches_by_type_prefix() {
    let classifier = PhotoClassifier::new(photo_sniffer());
    let fs = photo_fs();

    let jpeg = classifier.classify(Path::new("/r/photo.txt"), &fs).unwrap();
    assert_eq!(jpeg.file_type(), Some("JPEG"));
    assert_eq!(jpeg.file_size(), Some(2048));

    let text = classifier.classify(Path::new("/r/notes.md"), &fs).unwrap();
    assert_eq!(text.file_type(), Some("ASCII text"));
    assert_eq!(text.file_size(), Some(10));
    assert_eq!(text.len(), 2);
}

#[test]
fn test_stat_race_follows_failure_policy() {
    let classifier = PhotoClassifier::new(photo_sniffer()).with_store(MemoryStore::new());
    let mut strict =
        Spider::with_fs(SpiderBuilder::new("/r").build(), classifier, photo_fs()).unwrap();
    let err = strict.spider_root().unwrap_err();
    assert!(matches!(err, SpiderError::Stat { .. }));
    assert_eq!(strict.visitor().store().records().len(), 2);

    let classifier = PhotoClassifier::new(photo_sniffer()).with_store(MemoryStore::new());
    let mut isolated = Spider::with_fs(
        SpiderBuilder::new("/r")
            .failure_policy(FailurePolicy::Isolate)
            .build(),
        classifier,
        photo_fs(),
    )
    .unwrap();
    isolated.spider_root().unwrap();
    assert_eq!(isolated.file_count(), 3);
    assert_eq!(isolated.visitor().store().records().len(), 2);
    assert_eq!(isolated.failures()[0].0, PathBuf::from("/r/gone.jpg"));
}

#[test]
fn test_log_store_records_each_classified_file() {
    let classifier = PhotoClassifier::new(photo_sniffer());
    let fs = MemFs::new("/r")
        .file("/r/notes.md", 10)
        .file("/r/blob.bin", 4);
    let mut spider = Spider::with_fs(SpiderBuilder::new("/r").build(), classifier, fs).unwrap();
    let (result, lines) = logged(|| spider.spider_root());
    result.unwrap();
    assert!(has_event(&lines, "INFO", "Processing /r/notes.md"));
    assert!(has_event(
        &lines,
        "INFO",
        r#"Recording /r/notes.md {"file size": 10, "file type": "ASCII text"}"#
    ));
    assert!(has_event(&lines, "WARN", "Don't know how to handle type: data"));
    assert!(has_event(
        &lines,
        "INFO",
        r#"Recording /r/blob.bin {"file size": 4, "file type": "data"}"#
    ));
}

#[test]
fn test_inventory_strict_fails_on_stat_race() {
    let classifier = PhotoClassifier::new(photo_sniffer());
    let err = inventory_with(SpiderBuilder::new("/r").build(), &classifier, photo_fs()).unwrap_err();
    assert!(matches!(err, SpiderError::Stat { ref path, .. } if path == Path::new("/r/gone.jpg")));
}

#[test]
fn test_inventory_isolate_collects_walk_and_classification_failures() {
    let fs = photo_fs()
        .unreadable("/r/locked")
        .dir("/r/sub")
        .file("/r/sub/later.md", 3);
    let classifier = PhotoClassifier::new(photo_sniffer());
    let result = inventory_with(
        SpiderBuilder::new("/r")
            .failure_policy(FailurePolicy::Isolate)
            .build(),
        &classifier,
        fs,
    )
    .unwrap();

    let files: Vec<String> = result
        .files
        .iter()
        .map(|f| f.path.display().to_string())
        .collect();
    assert_eq!(files, vec!["/r/photo.txt", "/r/notes.md", "/r/sub/later.md"]);
    assert_eq!(result.files[2].record.file_type(), Some("data"));
    assert_eq!(paths(&result.directories), vec!["/r/locked", "/r/sub"]);

    let failed: Vec<&Path> = result.failures.iter().map(|(p, _)| p.as_path()).collect();
    assert_eq!(failed, vec![Path::new("/r/locked"), Path::new("/r/gone.jpg")]);
    assert!(result.failures[0].1.contains("cannot list directory /r/locked"));
}

#[test]
fn test_unknown_type_keeps_generic_fields() {
    let classifier = PhotoClassifier::new(photo_sniffer())
        .with_handlers(HandlerRegistry::empty())
        .with_store(MemoryStore::new());
    let fs = MemFs::new("/r").file("/r/photo.txt", 2048);
    let mut spider = Spider::with_fs(SpiderBuilder::new("/r").build(), classifier, fs).unwrap();
    let (result, lines) = logged(|| spider.spider_root());
    result.unwrap();
    assert!(has_event(
        &lines,
        "WARN",
        "Don't know how to handle type: JPEG image data, JFIF standard 1.01"
    ));
    let record = spider.visitor().store().get("/r/photo.txt").unwrap();
    assert_eq!(record.file_type(), Some("JPEG image data, JFIF standard 1.01"));
    assert_eq!(record.len(), 2);
}

struct Tagged(&'static str);

impl ContentHandler for Tagged {
    fn extract(&self, _path: &Path) -> Record {
        Record::new().with(FILE_TYPE, self.0).with("handler", self.0)
    }
}

#[test]
fn test_registry_first_match_wins() {
    let mut registry = HandlerRegistry::empty();
    registry.register(TypeMatcher::exact("PNG image data"), Tagged("exact"));
    registry.register(TypeMatcher::prefix("PNG"), Tagged("prefix"));
    registry.register(
        TypeMatcher::predicate(|t| t.contains("image")),
        Tagged("predicate"),
    );
    assert_eq!(registry.len(), 3);

    let pick = |description: &str| {
        registry
            .dispatch(description)
            .map(|h| h.extract(Path::new("x")))
            .and_then(|r| r.file_type().map(str::to_string))
    };
    assert_eq!(pick("PNG image data").as_deref(), Some("exact"));
    assert_eq!(pick("PNG image data, 1 x 1").as_deref(), Some("prefix"));
    assert_eq!(pick("GIF image data").as_deref(), Some("predicate"));
    assert_eq!(pick("ASCII text"), None);
}

#[test]
fn test_custom_handler_fields_override_generic_ones() {
    let mut classifier = PhotoClassifier::new(photo_sniffer());
    classifier
        .handlers_mut()
        .register(TypeMatcher::prefix("ASCII"), |_: &Path| {
            Record::new().with(FILE_TYPE, "TEXT").with(FILE_SIZE, 0u64)
        });
    assert_eq!(classifier.handlers().len(), 2);
    let record = classifier
        .classify(Path::new("/r/notes.md"), &photo_fs())
        .unwrap();
    assert_eq!(record.file_type(), Some("TEXT"));
    assert_eq!(record.file_size(), Some(0));
}

#[test]
fn test_record_merge_and_display() {
    let mut record = Record::new().with(FILE_TYPE, "JPEG image data").with(FILE_SIZE, 7u64);
    record.merge(Record::new().with(FILE_TYPE, "JPEG").with("width", 3u64));
    assert_eq!(record.file_type(), Some("JPEG"));
    assert_eq!(record.len(), 3);
    assert!(record.contains("width"));
    assert!(!record.contains("height"));
    assert_eq!(
        record.to_string(),
        r#"{"file size": 7, "file type": "JPEG", "width": 3}"#
    );
    assert_eq!(
        serde_json::to_string(&record).unwrap(),
        r#"{"file size":7,"file type":"JPEG","width":3}"#
    );
}
