//! picframe - touch-screen photo frame on the command line
//!
//! Runs the navigation state machine against a terminal "panel", and exposes
//! the catalog and the verified fetch pipeline as standalone commands.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use picframe_core::catalog::{discover_folders, Catalog};
use picframe_core::fetch::{destination_for, FetchPipeline, FetchRequest, FetchResult};
use picframe_core::navigation::{input_channel, HostNetwork, NavigationController, NoopPower};
use picframe_core::upload::UploadServer;
use picframe_core::PicframeConfig;

mod terminal;

use terminal::{feed_input, TerminalDisplay};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "picframe",
    about = "Browse, page through and fetch verified images for a touch-screen photo frame",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Log output format
    #[clap(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Configuration file (overrides PICFRAME_CONFIG and discovered files)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Drive the frame from text commands (tap X Y, hold X Y, release, multi ..., quit)
    Run {
        /// Read commands from a file instead of stdin
        #[clap(long)]
        script: Option<PathBuf>,
    },

    /// List the images in a directory, one page at a time
    List {
        /// Directory to list
        dir: PathBuf,

        /// Index of the first entry to show
        #[clap(long, default_value_t = 0)]
        start: usize,

        /// Entries per page (defaults to catalog.page_size)
        #[clap(long)]
        max: Option<usize>,

        /// Keep paging until the listing is exhausted
        #[clap(long)]
        all: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Show the image folders offered on the folder screen
    Folders {
        /// Media root (defaults to catalog.media_root)
        root: Option<PathBuf>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Download an image and verify it against the server's SHA-256 header
    Fetch {
        /// Image URL
        url: String,

        /// Destination file (defaults to fetch.download_dir/<name from URL>)
        #[clap(long, conflicts_with = "memory")]
        out: Option<PathBuf>,

        /// Verify into memory without writing anything
        #[clap(long)]
        memory: bool,
    },

    /// Serve the upload page and store posted images in the upload folder
    Serve {
        /// Address to listen on (overrides upload.listen)
        #[clap(long)]
        listen: Option<String>,
    },

    /// Print the effective configuration as YAML
    Config,
}

fn initialize_tracing(log_level: &LogLevel, log_format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr) // stdout carries command output
                .init();
        }
        LogFormat::Text => {
            // Rejected downloads are logged under the `integrity` target
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, &cli.log_format);

    let config = PicframeConfig::load(cli.config.as_deref())?;
    debug!("Effective config: {:?}", config);

    match cli.command {
        Command::Run { script } => run_command(config, script).await,
        Command::List {
            dir,
            start,
            max,
            all,
            json,
        } => list_command(&config, &dir, start, max, all, json),
        Command::Folders { root, json } => folders_command(&config, root, json),
        Command::Fetch { url, out, memory } => fetch_command(&config, url, out, memory).await,
        Command::Serve { listen } => serve_command(config, listen).await,
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn run_command(config: PicframeConfig, script: Option<PathBuf>) -> Result<()> {
    let (sender, receiver) = input_channel(config.input.queue_capacity);
    let mut controller =
        NavigationController::new(config, TerminalDisplay::default(), NoopPower, HostNetwork::default())
            .context("Failed to start navigation")?;

    let reader: Box<dyn std::io::BufRead + Send> = match script {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    // Detached: a thread parked on stdin must not hold up exit
    std::thread::spawn(move || {
        if let Err(e) = feed_input(reader, sender) {
            warn!("Input capture stopped: {:#}", e);
        }
    });

    let state = controller.run(receiver).await;
    info!("Navigation finished in {:?}", state);

    if let Some(message) = controller.last_error() {
        bail!("Session ended after an error: {message}");
    }
    Ok(())
}

/// Table row for catalog listings
#[derive(Tabled, Serialize)]
struct EntryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
}

#[derive(Serialize)]
struct ListOutput {
    base: String,
    start: usize,
    has_more: bool,
    entries: Vec<EntryRow>,
}

fn list_command(
    config: &PicframeConfig,
    dir: &Path,
    start: usize,
    max: Option<usize>,
    all: bool,
    json: bool,
) -> Result<()> {
    let page_size = max.unwrap_or(config.catalog.page_size);
    if page_size == 0 {
        bail!("--max must be at least 1");
    }

    let mut catalog = Catalog::new(config.catalog.filter());
    let mut rows = Vec::new();
    catalog
        .list(dir, start, page_size)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    loop {
        let page = catalog.page();
        rows.extend(page.entries.iter().enumerate().map(|(idx, entry)| EntryRow {
            index: page.page_start + idx,
            name: entry.file_name().to_string(),
            path: entry.to_string(),
        }));
        if !(all && page.has_more) {
            break;
        }
        catalog.next_page(page_size)?;
    }
    let has_more = catalog.page().has_more;

    if json {
        let output = ListOutput {
            base: dir.display().to_string(),
            start,
            has_more,
            entries: rows,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No images in {}", dir.display());
        return Ok(());
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    if has_more {
        println!("More entries follow; use --all or --start {}", start + rows.len());
    }

    Ok(())
}

fn folders_command(config: &PicframeConfig, root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = root.unwrap_or_else(|| config.catalog.media_root.clone());
    let folders = discover_folders(
        &root,
        &config.catalog.filter(),
        &config.catalog.excluded_folders,
    )
    .with_context(|| format!("Failed to scan {}", root.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else if folders.is_empty() {
        println!("No image folders in {}", root.display());
    } else {
        for folder in &folders {
            println!("{folder}");
        }
    }

    Ok(())
}

async fn fetch_command(
    config: &PicframeConfig,
    url: String,
    out: Option<PathBuf>,
    memory: bool,
) -> Result<()> {
    let pipeline = FetchPipeline::new(config.fetch.clone())?;
    let request = if memory {
        FetchRequest::to_memory(url)
    } else {
        let dest = out.unwrap_or_else(|| destination_for(&config.fetch.download_dir, &url));
        FetchRequest::to_file(url, dest)
    };

    let result = match pipeline.fetch(&request).await {
        Ok(result) => result,
        Err(e) => {
            let message = e.user_message();
            return Err(anyhow::Error::new(e).context(message));
        }
    };

    match &result {
        FetchResult::Stored(stored) => {
            println!("Saved {} ({} bytes)", stored.path.display(), stored.bytes_written)
        }
        FetchResult::Buffered(buffer) => println!("Verified {} bytes in memory", buffer.len()),
    }
    println!("{}", result.digest());

    Ok(())
}

async fn serve_command(mut config: PicframeConfig, listen: Option<String>) -> Result<()> {
    if let Some(listen) = listen {
        config.upload.listen = listen;
    }

    let server = UploadServer::bind(&config).await?;
    println!(
        "Listening on http://{} (uploads go to {})",
        server.local_addr()?,
        server.handler().upload_dir().display()
    );
    server.run().await
}
