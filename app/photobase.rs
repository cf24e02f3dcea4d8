//! Command-line interface for photobase.
//!
//! Walks a photo backup root, classifies every file by content and reports
//! one record per file.

use clap::{Parser, ValueEnum};
use photobase::{
    FailurePolicy, JsonLinesStore, PhotoClassifier, PhotoSpider, SpiderBuilder, SpiderError,
    Spider, SpiderOptions, inventory, store,
};
use std::io;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// photobase — inventory of a photo backup
#[derive(Parser)]
#[command(name = "photobase", version, about, long_about = None)]
struct Cli {
    /// Root directory to walk
    #[arg(env = "PHOTOBASE_ROOT")]
    root: PathBuf,

    /// Where records go
    #[arg(long, value_enum, default_value_t = OutputFormat::Log)]
    format: OutputFormat,

    /// Pretty output (indented JSON)
    #[arg(short, long)]
    pretty: bool,

    /// Max depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Ignore patterns (can be repeated)
    #[arg(short = 'I', long = "ignore")]
    ignore_patterns: Vec<String>,

    /// Skip unreadable subdirectories and files instead of aborting
    #[arg(long)]
    isolate_failures: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Log each record (no other output)
    Log,
    /// One JSON object per file on stdout
    Jsonl,
    /// A single JSON document with the whole inventory
    Json,
}

impl Cli {
    fn into_options(self) -> (SpiderOptions, OutputFormat, bool, String) {
        let policy = if self.isolate_failures {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Strict
        };
        let mut builder = SpiderBuilder::new(self.root)
            .failure_policy(policy)
            .ignore_patterns(self.ignore_patterns);

        builder = if let Some(depth) = self.max_depth {
            builder.max_depth(depth)
        } else {
            builder.no_limit_depth()
        };

        (builder.build(), self.format, self.pretty, self.log_level)
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let (options, format, pretty, log_level) = cli.into_options();
    init_logging(&log_level);

    let outcome = match format {
        OutputFormat::Log => run_log(options),
        OutputFormat::Jsonl => run_jsonl(options),
        OutputFormat::Json => run_json(options, pretty),
    };
    if let Err(e) = outcome {
        error!("walk aborted: {}", e);
        eprintln!("Error: {}", e);
        exit(1);
    }
}

fn run_log(options: SpiderOptions) -> Result<(), SpiderError> {
    let mut spider = PhotoSpider::open_with(options)?;
    spider.spider_root()?;
    info!("{} files processed", spider.file_count());
    Ok(())
}

fn run_jsonl(options: SpiderOptions) -> Result<(), SpiderError> {
    let classifier = PhotoClassifier::open()?.with_store(JsonLinesStore::new(io::stdout()));
    let mut spider = Spider::with_visitor(options, classifier)?;
    spider.spider_root()?;
    info!("{} files processed", spider.file_count());
    Ok(())
}

fn run_json(options: SpiderOptions, pretty: bool) -> Result<(), SpiderError> {
    let result = inventory(options)?;
    println!("{}", store::format_inventory(&result, pretty)?);
    info!("{} files processed", result.files.len());
    Ok(())
}
