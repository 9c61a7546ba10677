//! HTTP server command

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use roster_server::{run_server, MemoryStore, Store};

use crate::config::{FileConfig, ServerOverrides};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[arg(long, short = 'b', env = "ROSTER_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Maximum accepted size of an uploaded workbook, in bytes
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Database URL (overrides config file; ignored with --in-memory)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Keep everything in process memory; data is lost on exit
    #[arg(long)]
    pub in_memory: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, file: &FileConfig) -> Result<()> {
    let config = file.server_config(ServerOverrides {
        bind: args.bind,
        cors_permissive: args.cors_permissive,
        max_upload_bytes: args.max_upload_bytes,
    });

    let store: Arc<dyn Store> = if args.in_memory {
        tracing::warn!("Using in-memory store - nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let database_url = file.database_url(args.database_url)?;
        Arc::new(super::connect(&database_url, file).await?)
    };

    tracing::info!("Starting roster server on {}", config.bind_addr);

    // Blocks until shutdown; the store is closed on the way out
    run_server(store, config).await.context("Server error")?;

    Ok(())
}
