//! Command implementations for the roster CLI

pub mod export;
pub mod import;
pub mod migrate;
pub mod serve;

pub use export::run_export;
pub use import::run_import;
pub use migrate::run_migrate;
pub use serve::run_serve;

use anyhow::{Context, Result};
use roster_server::db::migrations;
use roster_server::db::pool::create_pool_with_options;
use roster_server::PgStore;

use crate::config::FileConfig;

/// Open a pool and make sure the tables exist.
async fn connect(database_url: &str, file: &FileConfig) -> Result<PgStore> {
    let pool = create_pool_with_options(database_url, file.max_connections())
        .await
        .context("Failed to create database pool")?;
    migrations::run(&pool)
        .await
        .context("Failed to bootstrap database schema")?;
    Ok(PgStore::new(pool))
}
