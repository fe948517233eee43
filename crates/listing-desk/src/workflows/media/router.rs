use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::store::BlobStore;
use super::uploader::{MediaUpload, MediaUploader, UploadError};
use super::MediaValidationError;
use crate::workflows::listings::router::USER_ID_HEADER;
use crate::workflows::listings::{identity_from_headers, ApiError};

pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Router exposing raw-body media uploads.
pub fn media_router<S>(uploader: Arc<MediaUploader<S>>) -> Router
where
    S: BlobStore + 'static,
{
    let body_limit = usize::try_from(uploader.limits().largest()).unwrap_or(usize::MAX);
    Router::new()
        .route("/api/v1/media", post(upload_handler::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(uploader)
}

pub(crate) async fn upload_handler<S>(
    State(uploader): State<Arc<MediaUploader<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: BlobStore + 'static,
{
    let user = match identity_from_headers(&headers) {
        Ok(Some(identity)) => identity.id,
        Ok(None) => return ApiError::Unauthenticated(USER_ID_HEADER).into_response(),
        Err(err) => return err.into_response(),
    };

    let Some(file_name) = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        let payload = json!({ "error": format!("{FILE_NAME_HEADER} header is required") });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    match uploader
        .upload(&user, MediaUpload::new(file_name, body.to_vec()))
        .await
    {
        Ok(uploaded) => (StatusCode::CREATED, Json(uploaded)).into_response(),
        Err(err) => {
            let status = match &err {
                UploadError::Invalid(MediaValidationError::TooLarge { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                UploadError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                UploadError::Rejected { .. } => StatusCode::BAD_GATEWAY,
                UploadError::Exhausted { .. } | UploadError::Aborted { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            };
            let payload = json!({ "error": err.to_string() });
            (status, Json(payload)).into_response()
        }
    }
}
