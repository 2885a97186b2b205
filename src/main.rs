use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::{style, Emoji};
use tracing_subscriber::EnvFilter;

mod args;
use args::*;

mod bucket;
use bucket::{bucket_for_display, BucketSource};

mod error;

mod store;
use store::VersionStore;

mod types;
use types::{Version, VersionRecord, DEFAULT_LIST_LIMIT, STORE_FILE};

#[derive(Parser)]
#[command(about, version)]
pub struct Args {
    /// Directory holding the version store
    #[arg(short = 'd', long, global = true, env = "HEADVER_DIR", default_value = ".")]
    dir:     PathBuf,
    /// File name of the version store
    #[arg(short = 'f', long, global = true, env = "HEADVER_FILE", default_value = STORE_FILE)]
    file:    String,
    /// Helper executable stamping versions [default: bucket by the current ISO week]
    #[arg(short = 'x', long, global = true, env = "HEADVER_HELPER")]
    helper:  Option<PathBuf>,
    /// Print debug logs to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and store the next version
    Next {
        /// Description of the version [default: "Version <version>"]
        description: Option<String>,
        /// Head number [default: head of the current version, or 0]
        head:        Option<u32>,
        /// Tag appended to the version as "+<suffix>"
        suffix:      Option<String>,
    },
    /// Show the current version
    Current,
    /// List recent versions
    List {
        /// Maximum number of versions to show
        #[arg(default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show version statistics
    Stats,
    /// Show how to continue with a new head number
    SetHead {
        /// Head number for the next versions
        head: u32,
    },
}

type Store = VersionStore<Box<dyn BucketSource>>;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(console::colors_enabled_stderr())
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<12} {}", style(format!("{}:", name)).blue(), value);
}

fn print_record(record: &VersionRecord) {
    field("description", &record.description);
    field("head", style(record.version.head).magenta());
    field("year-week", style(record.version.bucket).magenta());
    field("build", style(record.version.build).magenta());
}

fn next(store: &Store, description: Option<&str>, head: Option<u32>, suffix: Option<&str>) {
    let record = store
        .generate_next(head, description, get_suffix(suffix))
        .unwrap_or_else(|e| {
            eprintln!("{}: {}", style("couldn't generate version").red(), e);
            std::process::exit(-1);
        });
    println!(
        "{}{} {}",
        Emoji("✨ ", ""),
        style("generated version").green(),
        style(&record.version).magenta().bold()
    );
    field("description", &record.description);
}

fn current(store: &Store) {
    let Some(current) = store.read_current() else {
        println!("{}", style("no versions found").yellow());
        return;
    };
    println!(
        "{}{} {}",
        Emoji("🏷  ", ""),
        style("current version").green(),
        style(&current.version).magenta().bold()
    );
    print_record(&current);
    field("timestamp", current.timestamp.format("%Y-%m-%d %H:%M:%S"));
}

fn list(store: &Store, limit: usize) {
    let versions = store.read_current().into_iter().take(limit).collect::<Vec<_>>();
    if versions.is_empty() {
        println!("{}", style("no versions found").yellow());
        return;
    }
    println!("{}:", style("recent versions").blue().bright());
    for record in versions {
        println!(
            "  {} {}",
            style(&record.version).magenta(),
            style(&record.description).dim()
        );
    }
}

fn stats(store: &Store) {
    let current = store.read_current();
    match &current {
        Some(current) => {
            println!(
                "{}{} {}",
                Emoji("📊 ", ""),
                style("current version").green(),
                style(&current.version).magenta().bold()
            );
            print_record(current);
        }
        None => println!("{}", style("no version history").yellow()),
    }
    let head = current.as_ref().map(|c| c.version.head).unwrap_or(0);
    let bucket = bucket_for_display(&**store.source());
    field("this week", style(bucket).magenta());
    match store.next_build(head, bucket) {
        Ok(build) => field("next", style(Version::new(head, bucket, build, None)).magenta()),
        Err(e) => field("next", style(e).red()),
    }
    field("store", store.path().display());
}

fn set_head(store: &Store, head: u32) {
    let bucket = bucket_for_display(&**store.source());
    println!(
        "{}{} {} {}",
        Emoji("📌 ", ""),
        style("head").green(),
        style(head).magenta().bold(),
        style("will be used from the next version on").green()
    );
    let command = style(format!("headver next <description> {}", head)).bold();
    match store.next_build(head, bucket) {
        Ok(build) => println!(
            "      run {} to generate {}",
            command,
            style(Version::new(head, bucket, build, None)).magenta()
        ),
        Err(e) => println!("      run {} ({})", command, style(e).red()),
    }
}

fn main() {
    color_backtrace::install();

    let args = Args::parse();
    init_logging(args.verbose);

    let store = VersionStore::new(
        get_store_path(&args.dir, &args.file),
        get_source(args.helper.as_deref()),
    );

    match &args.command {
        Command::Next {
            description,
            head,
            suffix,
        } => next(&store, description.as_deref(), *head, suffix.as_deref()),
        Command::Current => current(&store),
        Command::List { limit } => list(&store, *limit),
        Command::Stats => stats(&store),
        Command::SetHead { head } => set_head(&store, *head),
    }
}
