//! roster CLI - student and group records service
//!
//! - `serve`: run the HTTP API
//! - `migrate`: create the tables
//! - `export` / `import`: move students between the database and xlsx workbooks

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

use config::FileConfig;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    author,
    version,
    about = "Student and group records: HTTP API plus xlsx import/export"
)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ./roster.toml if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create tables and indexes if missing
    Migrate(commands::migrate::MigrateArgs),
    /// Export students to an xlsx workbook, one sheet per group
    Export(commands::export::ExportArgs),
    /// Import students from an xlsx workbook
    Import(commands::import::ImportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env feeds clap's `env` lookups, so load it before parsing
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig { debug: cli.debug })?;
    let file = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, &file).await?,
        Commands::Migrate(args) => commands::run_migrate(args, &file).await?,
        Commands::Export(args) => commands::run_export(args, &file).await?,
        Commands::Import(args) => commands::run_import(args, &file).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["roster", "serve", "--in-memory", "--debug"]);
        assert!(cli.debug);
        match cli.command {
            Commands::Serve(args) => assert!(args.in_memory),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
