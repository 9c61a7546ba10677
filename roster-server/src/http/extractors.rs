//! Custom Axum extractors

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::request::Parts;

use roster_core::{RecordId, ValidationError};

use super::error::ApiError;

/// Extract and validate a record id from path
pub struct RecordIdParam(pub RecordId);

impl<S> FromRequestParts<S> for RecordIdParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let id = id.parse::<RecordId>().map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "must be an integer",
            })
        })?;

        Ok(Self(id))
    }
}

/// `axum::Json` whose rejections render as `ApiError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Multipart` whose rejections render as `ApiError`
#[derive(FromRequest)]
#[from_request(rejection(ApiError))]
pub struct ApiMultipart(pub axum::extract::Multipart);
