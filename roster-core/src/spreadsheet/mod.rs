//! xlsx import/export of student lists
//!
//! Export writes one worksheet per group, named after the group number.
//! Import reads the same layout back: sheet name identifies the group, the
//! first row is a header, each following row is
//! `ID | Name | Status | Created At | Updated At`.

mod export;
mod import;

pub use export::{export_workbook, partition_by_group};
pub use import::{ImportRow, ImportWorkbook};

/// Download name for exported workbooks
pub const EXPORT_FILENAME: &str = "students_export.xlsx";

/// Media type for xlsx responses
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Header row written on every sheet
pub const HEADER: [&str; 5] = ["ID", "Name", "Status", "Created At", "Updated At"];

/// `strftime` layout for timestamp cells
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from reading or writing workbooks
#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("Empty student list")]
    EmptyResult,

    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("sheet '{sheet}', row {row}, column {column}: {reason}")]
    InvalidCell {
        sheet: String,
        row: u32,
        column: &'static str,
        reason: String,
    },
}
