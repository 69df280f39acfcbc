//! AddonHub Server - serves many GitHub-hosted addons as one repository.
//!
//! This binary wraps the addonhub-core aggregator in an HTTP server and
//! provides subcommands for editing the local entries file.

mod entries_cmd;
mod handler;
mod server;

use addonhub_core::config::default_entries_path;
use addonhub_core::{AggregatorConfig, EntriesFile, EntrySource, Platform, RepositoryAggregator};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use entries_cmd::EntriesAction;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "addonhub")]
#[command(about = "Serve addons hosted on GitHub as a single repository")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = addonhub_core::AppConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local entries file (repeatable)
    #[arg(long = "entries-file")]
    entries_files: Vec<PathBuf>,

    /// Remote entries URL (repeatable)
    #[arg(long = "entries-url")]
    entries_urls: Vec<String>,

    /// GitHub token for addons without their own
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Maximum concurrent descriptor fetches when building addons.xml
    #[arg(long)]
    max_threads: Option<usize>,

    /// Cache time-to-live in seconds
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// Branch used when nothing else resolves
    #[arg(long)]
    default_branch: Option<String>,

    /// Override the detected system name
    #[arg(long)]
    system: Option<String>,

    /// Override the detected architecture name
    #[arg(long)]
    arch: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the repository server (default)
    Serve,
    /// Edit the local entries file and notify a running server
    Entries {
        /// Entries file to edit (defaults to the user data directory)
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: EntriesAction,
    },
}

impl Args {
    /// Merge the optional JSON config with command line flags.
    fn aggregator_config(&self) -> Result<AggregatorConfig> {
        let mut config = match &self.config {
            Some(path) => AggregatorConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AggregatorConfig::default(),
        };

        // Remote sources load first so local files can override them.
        if !self.entries_urls.is_empty() || !self.entries_files.is_empty() {
            config.sources = self
                .entries_urls
                .iter()
                .cloned()
                .map(EntrySource::Url)
                .chain(self.entries_files.iter().cloned().map(EntrySource::File))
                .collect();
        }
        if let Some(token) = &self.token {
            config.default_token = Some(token.clone());
        }
        if let Some(max_threads) = self.max_threads {
            config.max_threads = max_threads;
        }
        if let Some(cache_ttl) = self.cache_ttl {
            config.cache_ttl_secs = cache_ttl;
        }
        if let Some(branch) = &self.default_branch {
            config.default_branch = branch.clone();
        }
        if self.system.is_some() || self.arch.is_some() {
            let detected = config.resolved_platform();
            config.platform = Some(Platform::new(
                self.system.clone().unwrap_or(detected.system),
                self.arch.clone().unwrap_or(detected.arch),
            ));
        }
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => {
            let log_level = if debug { Level::DEBUG } else { Level::INFO };
            builder.with_max_level(log_level).init()
        }
    }
}

fn local_entries_path(file: Option<PathBuf>) -> Result<PathBuf> {
    file.or_else(default_entries_path)
        .context("No entries file given and no user data directory found")
}

async fn serve(args: &Args) -> Result<()> {
    let mut config = args.aggregator_config()?;
    if config.sources.is_empty() {
        let path = local_entries_path(None)?;
        EntriesFile::open(&path)?;
        info!("Using local entries file {}", path.display());
        config.sources.push(EntrySource::File(path));
    }

    let aggregator = Arc::new(RepositoryAggregator::new(config)?);
    match aggregator.update(true).await {
        Ok(count) => info!("Loaded {} addons", count),
        Err(e) => warn!("Initial entry load failed, serving what loaded: {}", e),
    }

    let addr = server::start_server(aggregator, &args.host, args.port).await?;
    info!("AddonHub running on http://{}", addr);

    // Machine-readable port line for launchers and tests (intentional stdout)
    println!("ADDONHUB_PORT={}", addr.port());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match &args.command {
        None | Some(Command::Serve) => {
            info!("Starting AddonHub server");
            serve(&args).await
        }
        Some(Command::Entries { file, action }) => {
            let path = local_entries_path(file.clone())?;
            entries_cmd::run(&path, action, args.port).await
        }
    }
}
