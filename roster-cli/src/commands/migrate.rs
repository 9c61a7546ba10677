use anyhow::Result;
use clap::Parser;
use roster_server::Store;

use crate::config::FileConfig;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Create the roster tables if they don't exist.
pub async fn run_migrate(args: MigrateArgs, file: &FileConfig) -> Result<()> {
    let database_url = file.database_url(args.database_url)?;
    let store = super::connect(&database_url, file).await?;
    store.close().await;

    println!("Schema is up to date");
    Ok(())
}
