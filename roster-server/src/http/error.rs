//! API error type with IntoResponse
//!
//! Every failure leaves a handler as `ApiError` and is rendered as
//! `{ "error": <code>, "detail": <message> }`.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use roster_core::{SpreadsheetError, ValidationError};

use crate::db::StoreError;
use crate::service::ServiceError;

#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request body or upload could not be read (400)
    BadRequest { code: &'static str, detail: String },

    /// Upload exceeded the configured body limit (413)
    PayloadTooLarge { detail: String },

    /// Resource not found by id (404)
    NotFound { resource: &'static str },

    /// Write referenced a missing row (404)
    MissingReference { resource: &'static str },

    /// Unique violation or referenced row (409)
    Conflict(String),

    /// Database error (500, logged)
    Database(StoreError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        match self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation_error", "detail": e.to_string() }),
            ),
            Self::BadRequest { code, detail } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": code, "detail": detail }),
            ),
            Self::PayloadTooLarge { detail } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": "payload_too_large", "detail": detail }),
            ),
            Self::NotFound { resource } | Self::MissingReference { resource } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "detail": format!("{} not found", resource) }),
            ),
            Self::Conflict(detail) => (
                StatusCode::CONFLICT,
                json!({ "error": "conflict", "detail": detail }),
            ),
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal_error", "detail": "an internal error occurred" }),
                )
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal_error", "detail": "an internal error occurred" }),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { resource, .. } => Self::NotFound { resource },
            StoreError::MissingReference { resource } => Self::MissingReference { resource },
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Store(e) => e.into(),
            ServiceError::Spreadsheet(SpreadsheetError::EmptyResult) => Self::BadRequest {
                code: "empty_result",
                detail: SpreadsheetError::EmptyResult.to_string(),
            },
            ServiceError::Spreadsheet(e) => Self::Internal { message: e.to_string() },
            ServiceError::Import(detail) => Self::BadRequest {
                code: "import_failed",
                detail,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            code: "invalid_body",
            detail: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn upload(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge { detail }
        } else {
            Self::BadRequest {
                code: "invalid_upload",
                detail,
            }
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::upload(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::upload(e.status(), e.body_text())
    }
}
