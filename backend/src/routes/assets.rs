use std::sync::Arc;

use axum::{
    body::Body,
    extract::Path,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::{placement::StoragePlacement, types::AppError};

/// Streams an object written with the platform URL form
///
/// # Errors
///
/// - `not_found` - Unknown key, or the deployment does not serve assets
/// - `storage_error` / `upstream_error` - Object storage download failed
#[instrument(skip(placement))]
pub async fn get_asset(
    Extension(placement): Extension<Arc<StoragePlacement>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let object = placement.open_asset(&key).await?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
    let stream = ReaderStream::new(object.body.into_async_read());

    let mut response = (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(stream),
    )
        .into_response();

    if let Some(length) = object.content_length {
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(response)
}
