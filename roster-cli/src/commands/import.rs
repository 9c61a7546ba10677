//! Apply an xlsx workbook to the database

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use roster_server::service;
use roster_server::Store;

use crate::config::FileConfig;

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Workbook to import; each sheet is named after a group number
    pub file: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub async fn run_import(args: ImportArgs, file: &FileConfig) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let database_url = file.database_url(args.database_url)?;
    let store = super::connect(&database_url, file).await?;

    let result = service::import_students(&store, bytes).await;
    store.close().await;
    let summary = result.context("Import failed")?;

    println!(
        "Imported {}: {} created, {} updated",
        args.file.display(),
        summary.created,
        summary.updated
    );
    for sheet in &summary.skipped_sheets {
        println!("  skipped sheet '{}' (no matching group)", sheet);
    }
    Ok(())
}
