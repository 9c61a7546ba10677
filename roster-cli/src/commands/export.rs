//! Write a filtered student list to an xlsx workbook

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use roster_core::{SortDirection, SortKey, SortSpec, StudentFilter};
use roster_server::service;
use roster_server::Store;

use crate::config::FileConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortBy {
    Id,
    Name,
    Status,
    GroupId,
    CreatedAt,
}

impl From<SortBy> for SortKey {
    fn from(value: SortBy) -> Self {
        match value {
            SortBy::Id => SortKey::Id,
            SortBy::Name => SortKey::Name,
            SortBy::Status => SortKey::Status,
            SortBy::GroupId => SortKey::GroupId,
            SortBy::CreatedAt => SortKey::CreatedAt,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Only students whose name contains this text (case-sensitive)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub group_id: Option<i32>,

    /// Course number of the student's group
    #[arg(long)]
    pub course_number: Option<i32>,

    #[arg(long)]
    pub status: Option<bool>,

    #[arg(long, value_enum, default_value_t = SortBy::Id)]
    pub sort_by: SortBy,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    #[arg(long, default_value_t = 0)]
    pub skip: i64,

    #[arg(long, default_value_t = 1000)]
    pub take: i64,
}

impl ExportArgs {
    fn filter(&self) -> StudentFilter {
        StudentFilter {
            skip: self.skip,
            take: self.take,
            name: self.name.clone(),
            group_id: self.group_id,
            course_number: self.course_number,
            status: self.status,
            order: Some(SortSpec {
                by: self.sort_by.into(),
                direction: if self.desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            }),
        }
    }
}

pub async fn run_export(args: ExportArgs, file: &FileConfig) -> Result<()> {
    let database_url = file.database_url(args.database_url.clone())?;
    let store = super::connect(&database_url, file).await?;

    let result = service::export_students(&store, args.filter()).await;
    store.close().await;
    let bytes = result.context("Export failed")?;

    tokio::fs::write(&args.out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    println!("Wrote {} ({} bytes)", args.out.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_a_filter() {
        let args = ExportArgs::parse_from([
            "export",
            "--out",
            "x.xlsx",
            "--name",
            "ann",
            "--course-number",
            "2",
            "--sort-by",
            "created-at",
            "--desc",
        ]);
        let filter = args.filter();
        assert_eq!(filter.name.as_deref(), Some("ann"));
        assert_eq!(filter.course_number, Some(2));
        assert_eq!(filter.take, 1000);
        assert_eq!(
            filter.order,
            Some(SortSpec { by: SortKey::CreatedAt, direction: SortDirection::Desc })
        );
    }
}
