//! radlabel RPC Server - JSON-RPC backend for the labeling frontend.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the radlabel-core
//! library for the page that shows images and collects judgments.

mod handlers;
mod server;
mod wrapper;

use anyhow::{anyhow, Result};
use clap::Parser;
use radlabel_core::{LabelApi, LabelScheme};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "radlabel-rpc")]
#[command(about = "JSON-RPC server for radlabel")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Labeling root containing data/, doctor_labels/ and the allow-list (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Configuration file (defaults to <root>/radlabel.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scheme for modalities without their own entry: difficulty or confidence
    #[arg(long, value_parser = parse_scheme)]
    default_scheme: Option<LabelScheme>,

    /// Create the root, data and labels directories if missing
    #[arg(long)]
    create_dirs: bool,
}

fn parse_scheme(value: &str) -> std::result::Result<LabelScheme, String> {
    LabelScheme::from_str(value)
        .ok_or_else(|| format!("unknown scheme '{}' (expected difficulty or confidence)", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting radlabel RPC Server");

    let root = match args.root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    info!("Labeling root: {}", root.display());

    // Create the API instance
    let mut builder = LabelApi::builder(&root).auto_create_dirs(args.create_dirs);
    if let Some(config) = args.config {
        builder = builder.config_file(config);
    }
    if let Some(scheme) = args.default_scheme {
        builder = builder.default_scheme(scheme);
    }
    let api = builder
        .build()
        .map_err(|e| anyhow!("Failed to open labeling root {}: {}", root.display(), e))?;

    // Start the server
    let addr = server::start_server(api, &args.host, args.port).await?;

    // Print port for the frontend launcher to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
