//! Group endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};

use roster_core::{Group, GroupDraft, GroupPayload};

use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, RecordIdParam};
use crate::http::server::AppState;

/// POST /groups - create a group; the number is stored upper-cased
async fn create_group(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let draft = GroupDraft::try_from(payload)?;
    let group = state.store.create_group(draft).await?;
    tracing::info!(group_id = group.id, group_number = %group.group_number, "group created");

    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups - all groups by group number
async fn list_groups(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(state.store.list_groups().await?))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(state.store.find_group(id).await?))
}

async fn update_group(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
    ApiJson(payload): ApiJson<GroupPayload>,
) -> Result<Json<Group>, ApiError> {
    let draft = GroupDraft::try_from(payload)?;
    Ok(Json(state.store.update_group(id, draft).await?))
}

/// DELETE /groups/{id} - returns the removed group
async fn delete_group(
    State(state): State<Arc<AppState>>,
    RecordIdParam(id): RecordIdParam,
) -> Result<Json<Group>, ApiError> {
    let group = state.store.delete_group(id).await?;
    tracing::info!(group_id = id, "group deleted");
    Ok(Json(group))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/", get(list_groups).post(create_group))
        .route(
            "/groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
}
