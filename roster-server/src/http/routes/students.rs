//! Student endpoints: CRUD, filtered listing, xlsx export/import

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use roster_core::spreadsheet::{EXPORT_FILENAME, XLSX_CONTENT_TYPE};
use roster_core::{StatusChange, Student, StudentDraft, StudentFilter, StudentList, StudentPayload};

use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiMultipart, RecordIdParam};
use crate::http::server::AppState;
use crate::service::{self, ImportSummary};

/// Multipart field carrying the workbook
const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
struct ImportResponse {
    status: &'static str,
    #[serde(flatten)]
    summary: ImportSummary,
}

/// POST /students/filter
async fn filter_students(
    State(state): State<Arc<AppState>>,
    ApiJson(filter): ApiJson<StudentFilter>,
) -> Result<Json<StudentList>, ApiError> {
    let list = service::list_students(state.store.as_ref(), filter).await?;
    Ok(Json(list))
}

/// POST /students/export - same body as filter, answers with an xlsx attachment
async fn export_students(
    State(state): State<Arc<AppState>>,
    ApiJson(filter): ApiJson<StudentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = service::export_students(state.store.as_ref(), filter).await?;

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", EXPORT_FILENAME),
        ),
    ];
    Ok((headers, bytes))
}

/// POST /students/import - multipart upload, all rows applied or none
async fn import_students(
    State(state): State<Arc<AppState>>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| ApiError::BadRequest {
        code: "invalid_upload",
        detail: format!("missing '{}' field", UPLOAD_FIELD),
    })?;

    tracing::info!(bytes = bytes.len(), "importing workbook");
    let summary = service::import_students(state.store.as_ref(), bytes.to_vec()).await?;

    Ok(Json(ImportResponse {
        status: "success",
        summary,
    }))
}

async fn create_student(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<StudentPayload>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let draft = StudentDraft::try_from(payload)?;
    let student = state.store.create_student(draft).await?;
    tracing::info!(student_id = student.id, group_id = student.group_id, "student created");

    Ok((StatusCode::CREATED, Json(student)))
}

async fn get_student(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(state.store.find_student(id).await?))
}

async fn update_student(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
    ApiJson(payload): ApiJson<StudentPayload>,
) -> Result<Json<Student>, ApiError> {
    let draft = StudentDraft::try_from(payload)?;
    Ok(Json(state.store.update_student(id, draft).await?))
}

/// PATCH /students/changeStatus - status-only update
async fn change_status(
    State(state): State<Arc<AppState>>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .store
        .set_student_status(change.student_id, change.status)
        .await?;
    Ok(Json(student))
}

async fn delete_student(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
) -> Result<Json<Student>, ApiError> {
    let student = state.store.delete_student(id).await?;
    tracing::info!(student_id = id, "student deleted");
    Ok(Json(student))
}

/// Student routes. Static segments take priority over `{id}`.
pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/students", post(create_student))
        .route("/students/", post(create_student))
        .route("/students/filter", post(filter_students))
        .route("/students/export", post(export_students))
        .route(
            "/students/import",
            post(import_students).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/students/changeStatus", patch(change_status))
        .route(
            "/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}
