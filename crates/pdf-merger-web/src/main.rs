//! PDF Merger Web - Web server that merges uploaded PDFs and images.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdf_merger_core::{ServiceConfig, StorageBackend};
use pdf_merger_web::{AppState, app};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where uploaded parts are buffered during a request
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageOption {
    Memory,
    TempDir,
}

impl From<StorageOption> for StorageBackend {
    fn from(option: StorageOption) -> Self {
        match option {
            StorageOption::Memory => Self::Memory,
            StorageOption::TempDir => Self::TempDir,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-merger-web")]
#[command(author, version, about = "PDF Merger Web Server", long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/pdf-merger/config.toml or ./config.toml)
    #[arg(short, long, env = "PDF_MERGER_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "PDF_MERGER_HOST")]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "PDF_MERGER_PORT")]
    port: Option<u16>,

    /// Upload storage backend
    #[arg(long, value_enum, env = "PDF_MERGER_STORAGE")]
    storage: Option<StorageOption>,

    /// Parent directory for temp-dir storage
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Reject files whose content does not match their extension
    #[arg(long)]
    sniff_content: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Apply command line overrides on top of file configuration.
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(storage) = self.storage {
            config.storage.backend = storage.into();
        }
        if let Some(dir) = self.temp_dir {
            config.storage.temp_dir = Some(dir);
        }
        if self.sniff_content {
            config.validation.sniff_content = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    let state = Arc::new(AppState::new(config));
    info!(
        "Using {} engine with {} storage",
        state.orchestrator.engine_name(),
        state.blob_store.name()
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Starting server at http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
