//! Custom extractors for request validation

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

use crate::types::error::AppError;

/// Custom JSON extractor that validates the payload
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_content_type",
                    "Missing Content-Type: application/json header",
                    false,
                ),
                _ => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_json",
                    "Invalid JSON payload",
                    false,
                ),
            })?;

        payload.validate().map_err(|errors| {
            tracing::debug!("Validation failed: {errors}");
            AppError::new(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed",
                false,
            )
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

/// `{videoID}` path segment parsed as a UUID
pub struct VideoIdPath(pub Uuid);

/// Documents the `{videoID}` path parameter
#[derive(JsonSchema)]
#[allow(dead_code)]
struct VideoIdParams {
    #[serde(rename = "videoID")]
    video_id: Uuid,
}

impl<S> FromRequestParts<S> for VideoIdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| invalid_id())?;

        Uuid::parse_str(&raw).map(Self).map_err(|_| invalid_id())
    }
}

const fn invalid_id() -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "invalid_id", "Invalid ID", false)
}

impl OperationInput for VideoIdPath {
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Path::<VideoIdParams>::operation_input(ctx, operation);
    }
}
