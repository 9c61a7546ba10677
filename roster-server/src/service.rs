//! Listing, export and import, shared by the HTTP handlers and the CLI

use serde::Serialize;

use roster_core::spreadsheet::{export_workbook, ImportWorkbook};
use roster_core::{
    GroupNumber, SpreadsheetError, StudentDraft, StudentFilter, StudentList, StudentName,
    ValidationError,
};

use crate::db::{Store, StoreError, StudentUpsert};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    /// Anything that went wrong while applying an uploaded workbook.
    /// Nothing was written.
    #[error("{0}")]
    Import(String),
}

/// Result of applying a workbook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    /// Sheets whose name matched no group
    pub skipped_sheets: Vec<String>,
}

/// One page of students plus the total matching the filter.
pub async fn list_students(store: &dyn Store, filter: StudentFilter) -> Result<StudentList, ServiceError> {
    let query = filter.into_query()?;
    let students = store.find_students(&query).await?;
    let count = store.count_students(&query.predicate).await?;

    Ok(StudentList {
        students,
        count,
        skip: query.skip,
        take: query.take,
    })
}

/// Workbook bytes for one page of students.
pub async fn export_students(store: &dyn Store, filter: StudentFilter) -> Result<Vec<u8>, ServiceError> {
    let query = filter.into_query()?;
    let students = store.find_students(&query).await?;
    tracing::info!(students = students.len(), "exporting students");

    Ok(export_workbook(&students)?)
}

/// Apply an uploaded workbook in a single batch.
///
/// Every failure, including a malformed file, is reported as
/// `ServiceError::Import` carrying the underlying message.
pub async fn import_students(store: &dyn Store, bytes: Vec<u8>) -> Result<ImportSummary, ServiceError> {
    apply_workbook(store, bytes).await.map_err(|e| match e {
        ServiceError::Import(_) => e,
        other => ServiceError::Import(other.to_string()),
    })
}

async fn apply_workbook(store: &dyn Store, bytes: Vec<u8>) -> Result<ImportSummary, ServiceError> {
    let mut workbook = ImportWorkbook::open(bytes)?;
    let mut summary = ImportSummary::default();
    let mut batch = Vec::new();

    for sheet in workbook.sheet_names() {
        // Sheet names that can't be group numbers can't match one either
        let group = match GroupNumber::new(&sheet) {
            Ok(number) => store.find_group_by_number(&number).await?,
            Err(_) => None,
        };
        let Some(group) = group else {
            tracing::debug!(sheet = %sheet, "no group for sheet, skipping");
            summary.skipped_sheets.push(sheet);
            continue;
        };

        for row in workbook.rows(&sheet)? {
            let name = StudentName::new(&row.name).map_err(|e| SpreadsheetError::InvalidCell {
                sheet: sheet.clone(),
                row: row.row,
                column: "Name",
                reason: e.to_string(),
            })?;
            batch.push(StudentUpsert {
                id: row.id,
                draft: StudentDraft {
                    name,
                    group_id: group.id,
                    status: row.status,
                },
            });
        }
    }

    if !batch.is_empty() {
        let applied = store.upsert_students(batch).await?;
        summary.created = applied.created;
        summary.updated = applied.updated;
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped_sheets.len(),
        "import applied"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use roster_core::GroupDraft;
    use rust_xlsxwriter::Workbook;

    async fn seeded() -> (MemoryStore, i32) {
        let store = MemoryStore::new();
        let group = store
            .create_group(GroupDraft {
                group_number: GroupNumber::new("ip-21").unwrap(),
                course_number: 2,
            })
            .await
            .unwrap();
        (store, group.id)
    }

    fn sheet_with_rows(sheet_name: &str, rows: &[(Option<f64>, &str, bool)]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        sheet.write_string(0, 0, "ID").unwrap();
        for (i, (id, name, status)) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            if let Some(id) = id {
                sheet.write_number(r, 0, *id).unwrap();
            }
            sheet.write_string(r, 1, *name).unwrap();
            sheet.write_boolean(r, 2, *status).unwrap();
        }
        wb.save_to_buffer().unwrap()
    }

    #[tokio::test]
    async fn list_reports_total_and_window() {
        let (store, group_id) = seeded().await;
        for name in ["a", "b", "c"] {
            store
                .create_student(StudentDraft {
                    name: StudentName::new(name).unwrap(),
                    group_id,
                    status: true,
                })
                .await
                .unwrap();
        }

        let list = list_students(&store, StudentFilter { take: 2, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(list.students.len(), 2);
        assert_eq!(list.count, 3);
        assert_eq!((list.skip, list.take), (0, 2));
    }

    #[tokio::test]
    async fn export_of_nothing_is_empty_result() {
        let (store, _) = seeded().await;
        let err = export_students(&store, StudentFilter::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Spreadsheet(SpreadsheetError::EmptyResult)));
    }

    #[tokio::test]
    async fn sheet_name_matches_group_case_insensitively() {
        let (store, group_id) = seeded().await;
        let bytes = sheet_with_rows("Ip-21", &[(None, "Anna", true)]);

        let summary = import_students(&store, bytes).await.unwrap();
        assert_eq!(summary.created, 1);
        assert!(summary.skipped_sheets.is_empty());

        let list = list_students(&store, StudentFilter::default()).await.unwrap();
        assert_eq!(list.students[0].group_id, group_id);
    }

    #[tokio::test]
    async fn blank_name_fails_the_whole_import() {
        let (store, _) = seeded().await;
        let bytes = sheet_with_rows("IP-21", &[(None, "Anna", true), (None, "  ", true)]);

        let err = import_students(&store, bytes).await.unwrap_err();
        match err {
            ServiceError::Import(message) => {
                assert_eq!(message, "sheet 'IP-21', row 3, column Name: name cannot be empty")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let list = list_students(&store, StudentFilter::default()).await.unwrap();
        assert_eq!(list.count, 0);
    }

    #[tokio::test]
    async fn garbage_upload_is_an_import_error() {
        let (store, _) = seeded().await;
        let err = import_students(&store, b"not a workbook".to_vec()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Import(_)));
    }
}
