use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    DeletionRequestId, DeletionTarget, EditRequestId, Identity, ListingDetails, PropertyFilter,
    PropertyId, PropertyRequest, PropertySubmission, RequestId, Role, UserId,
};
use super::lifecycle::{RequestStatus, ReviewStatus};
use super::notify::ListingNotifier;
use super::patch::ListingChanges;
use super::repository::{ListingRepository, RepositoryError};
use super::service::{ListingServiceError, ListingWorkflowService};
use super::validation::ValidationError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

type Service<R, N> = State<Arc<ListingWorkflowService<R, N>>>;

/// Router builder exposing intake, review, and browse endpoints.
pub fn listing_router<R, N>(service: Arc<ListingWorkflowService<R, N>>) -> Router
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    Router::new()
        .route("/api/v1/property-requests", post(submit_handler::<R, N>))
        .route(
            "/api/v1/property-requests/:request_id",
            get(request_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/property-requests",
            get(request_queue_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/property-requests/export",
            get(export_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/property-requests/:request_id/approve",
            post(approve_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/property-requests/:request_id/reject",
            post(reject_handler::<R, N>),
        )
        .route(
            "/api/v1/deletion-requests",
            post(deletion_request_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/deletion-requests",
            get(deletion_queue_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/deletion-requests/:deletion_id/approve",
            post(approve_deletion_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/deletion-requests/:deletion_id/reject",
            post(reject_deletion_handler::<R, N>),
        )
        .route(
            "/api/v1/properties",
            get(browse_handler::<R, N>).post(create_property_handler::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id",
            get(property_handler::<R, N>),
        )
        .route("/api/v1/my/properties", get(owned_handler::<R, N>))
        .route(
            "/api/v1/admin/properties/:property_id/publish",
            post(publish_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/properties/:property_id",
            delete(hard_delete_handler::<R, N>),
        )
        .route(
            "/api/v1/properties/:property_id/edit-requests",
            post(submit_edit_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/edit-requests",
            get(edit_queue_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/edit-requests/:edit_id/review",
            get(review_edit_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/edit-requests/:edit_id/approve",
            post(approve_edit_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/edit-requests/:edit_id/reject",
            post(reject_edit_handler::<R, N>),
        )
        .with_state(service)
}

impl ListingServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transition(_) | Self::Repository(RepositoryError::Conflict) => {
                StatusCode::CONFLICT
            }
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure surfaced by a listing endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid {0} header")]
    Unauthenticated(&'static str),
    #[error(transparent)]
    Service(#[from] ListingServiceError),
    #[error(transparent)]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Service(err) => err.status_code(),
            Self::Body(rejection) => rejection.status(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Service(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "listing request failed");
        }
        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}

/// Read the caller identity forwarded by the authentication proxy.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    let Some(raw_id) = header_value(headers, USER_ID_HEADER) else {
        return Ok(None);
    };
    let id = UserId::from_str(raw_id).map_err(|_| ApiError::Unauthenticated(USER_ID_HEADER))?;
    let email = header_value(headers, USER_EMAIL_HEADER)
        .unwrap_or_default()
        .to_string();
    let role = match header_value(headers, USER_ROLE_HEADER) {
        None => Role::User,
        Some(raw) if raw.eq_ignore_ascii_case("admin") => Role::Admin,
        Some(raw) if raw.eq_ignore_ascii_case("user") => Role::User,
        Some(_) => return Err(ApiError::Unauthenticated(USER_ROLE_HEADER)),
    };
    Ok(Some(Identity { id, email, role }))
}

fn require_identity(headers: &HeaderMap) -> Result<Identity, ApiError> {
    identity_from_headers(headers)?.ok_or(ApiError::Unauthenticated(USER_ID_HEADER))
}

/// Review bodies are optional; a request without a JSON body reviews with no notes.
fn body_or_default<T: Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestQueueQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQueueQuery {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveBody {
    #[serde(default)]
    pub changes: Option<ListingChanges>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeletionBody {
    #[serde(default)]
    pub property_request_id: Option<String>,
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EditBody {
    #[serde(default)]
    pub changes: ListingChanges,
    #[serde(default)]
    pub message: Option<String>,
}

pub(crate) async fn submit_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Json(submission): Json<PropertySubmission>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let submitter = identity_from_headers(&headers)?;
    let request = service.submit(submitter.as_ref(), submission)?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

pub(crate) async fn request_handler<R, N>(
    State(service): Service<R, N>,
    Path(request_id): Path<String>,
) -> Result<Json<PropertyRequest>, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let request_id = RequestId::from_str(&request_id)?;
    Ok(Json(service.get_request(&request_id)?))
}

pub(crate) async fn request_queue_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Query(query): Query<RequestQueueQuery>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let requests = service.requests(&admin, query.status)?;
    Ok(Json(requests).into_response())
}

pub(crate) async fn export_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Query(query): Query<RequestQueueQuery>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let csv = service.export_requests_csv(&admin, query.status)?;
    Ok((
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"property-requests.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

pub(crate) async fn approve_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    body: Result<Json<ApproveBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let body: ApproveBody = body_or_default(body)?;
    let request_id = RequestId::from_str(&request_id)?;
    let outcome = service.approve(&admin, &request_id, body.changes, body.admin_notes)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn reject_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    body: Result<Json<ReasonBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let body: ReasonBody = body_or_default(body)?;
    let request_id = RequestId::from_str(&request_id)?;
    let request = service.reject(&admin, &request_id, body.reason)?;
    Ok(Json(request).into_response())
}

pub(crate) async fn deletion_request_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Json(body): Json<DeletionBody>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = require_identity(&headers)?;
    let property_request_id = body
        .property_request_id
        .as_deref()
        .map(RequestId::from_str)
        .transpose()?;
    let property_id = body
        .property_id
        .as_deref()
        .map(PropertyId::from_str)
        .transpose()?;
    let target = DeletionTarget::from_parts(property_request_id, property_id)?;

    let deletion = service.request_deletion(&actor, target, body.reason)?;
    Ok((StatusCode::CREATED, Json(deletion)).into_response())
}

pub(crate) async fn deletion_queue_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    Ok(Json(service.deletion_requests(&admin, query.status)?).into_response())
}

pub(crate) async fn approve_deletion_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(deletion_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let deletion_id = DeletionRequestId::from_str(&deletion_id)?;
    Ok(Json(service.approve_deletion(&admin, &deletion_id)?).into_response())
}

pub(crate) async fn reject_deletion_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(deletion_id): Path<String>,
    body: Result<Json<ReasonBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let body: ReasonBody = body_or_default(body)?;
    let deletion_id = DeletionRequestId::from_str(&deletion_id)?;
    Ok(Json(service.reject_deletion(&admin, &deletion_id, body.reason)?).into_response())
}

pub(crate) async fn browse_handler<R, N>(
    State(service): Service<R, N>,
    Query(filter): Query<PropertyFilter>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    Ok(Json(service.browse(&filter)?).into_response())
}

pub(crate) async fn create_property_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Json(details): Json<ListingDetails>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let owner = require_identity(&headers)?;
    let property = service.create_property(&owner, details)?;
    Ok((StatusCode::CREATED, Json(property)).into_response())
}

pub(crate) async fn property_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(property_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let viewer = identity_from_headers(&headers)?;
    let property_id = PropertyId::from_str(&property_id)?;
    Ok(Json(service.get_property(viewer.as_ref(), &property_id)?).into_response())
}

pub(crate) async fn owned_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let owner = require_identity(&headers)?;
    Ok(Json(service.owned_properties(&owner)?).into_response())
}

pub(crate) async fn publish_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(property_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let property_id = PropertyId::from_str(&property_id)?;
    Ok(Json(service.publish_property(&admin, &property_id)?).into_response())
}

pub(crate) async fn hard_delete_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(property_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let property_id = PropertyId::from_str(&property_id)?;
    service.hard_delete_property(&admin, &property_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn submit_edit_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(property_id): Path<String>,
    Json(body): Json<EditBody>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let owner = require_identity(&headers)?;
    let property_id = PropertyId::from_str(&property_id)?;
    let edit = service.submit_edit(&owner, &property_id, body.changes, body.message)?;
    Ok((StatusCode::CREATED, Json(edit)).into_response())
}

pub(crate) async fn edit_queue_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    Ok(Json(service.edit_requests(&admin, query.status)?).into_response())
}

pub(crate) async fn review_edit_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(edit_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let edit_id = EditRequestId::from_str(&edit_id)?;
    Ok(Json(service.review_edit(&admin, &edit_id)?).into_response())
}

pub(crate) async fn approve_edit_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(edit_id): Path<String>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let edit_id = EditRequestId::from_str(&edit_id)?;
    Ok(Json(service.approve_edit(&admin, &edit_id)?).into_response())
}

pub(crate) async fn reject_edit_handler<R, N>(
    State(service): Service<R, N>,
    headers: HeaderMap,
    Path(edit_id): Path<String>,
    body: Result<Json<ReasonBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let admin = require_identity(&headers)?;
    let body: ReasonBody = body_or_default(body)?;
    let edit_id = EditRequestId::from_str(&edit_id)?;
    Ok(Json(service.reject_edit(&admin, &edit_id, body.reason)?).into_response())
}
