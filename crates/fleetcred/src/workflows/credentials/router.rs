use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use mime::Mime;
use serde::Deserialize;
use serde_json::json;

use crate::storage::{DocumentStore, DocumentStoreError};
use crate::workflows::fleet::{DriverId, FleetRepository, VehicleId};

use super::domain::{
    CredentialId, CredentialSubject, CredentialSubmission, CredentialTypeId, ReviewAction,
};
use super::repository::{CredentialRepository, RepositoryError};
use super::service::{CredentialService, CredentialServiceError};

/// Router builder exposing credential endpoints for drivers, vehicles, and
/// the review desk.
pub fn credential_router<R, F, S>(service: Arc<CredentialService<R, F, S>>) -> Router
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/drivers/:driver_id/credentials",
            get(driver_credentials_handler::<R, F, S>),
        )
        .route(
            "/api/v1/vehicles/:vehicle_id/credentials",
            get(vehicle_credentials_handler::<R, F, S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/credentials/:credential_type_id/ensure",
            post(ensure_driver_credential_handler::<R, F, S>),
        )
        .route(
            "/api/v1/vehicles/:vehicle_id/credentials/:credential_type_id/ensure",
            post(ensure_vehicle_credential_handler::<R, F, S>),
        )
        .route(
            "/api/v1/credentials/:credential_id/submit",
            post(submit_handler::<R, F, S>),
        )
        .route(
            "/api/v1/credentials/:credential_id/documents",
            post(upload_document_handler::<R, F, S>),
        )
        .route(
            "/api/v1/documents/signed-url",
            get(signed_url_handler::<R, F, S>),
        )
        .route(
            "/api/v1/credentials/:credential_id/review",
            post(review_handler::<R, F, S>),
        )
        .route(
            "/api/v1/credentials/:credential_id/history",
            get(history_handler::<R, F, S>),
        )
        .route("/api/v1/review-queue", get(review_queue_handler::<R, F, S>))
        .route(
            "/api/v1/review-queue/stats",
            get(review_stats_handler::<R, F, S>),
        )
        .with_state(service)
}

fn error_response(error: CredentialServiceError) -> Response {
    let status = match &error {
        CredentialServiceError::UnknownType
        | CredentialServiceError::UnknownCredential
        | CredentialServiceError::UnknownDriver
        | CredentialServiceError::UnknownVehicle
        | CredentialServiceError::Repository(RepositoryError::NotFound)
        | CredentialServiceError::Storage(DocumentStoreError::NotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        CredentialServiceError::CategoryMismatch
        | CredentialServiceError::MechanismMismatch { .. }
        | CredentialServiceError::AdminOnlySubmission
        | CredentialServiceError::InvalidSubmission(_)
        | CredentialServiceError::NotPendingReview
        | CredentialServiceError::NotAdminVerified
        | CredentialServiceError::InvalidCatalogChange(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CredentialServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CredentialServiceError::Repository(_) | CredentialServiceError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn driver_credentials_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(driver_id): Path<String>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.credentials_for_driver(&DriverId(driver_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn vehicle_credentials_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(vehicle_id): Path<String>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.credentials_for_vehicle(&VehicleId(vehicle_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ensure_driver_credential_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path((driver_id, credential_type_id)): Path<(String, String)>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    let subject = CredentialSubject::Driver(DriverId(driver_id));
    match service.ensure(subject, &CredentialTypeId(credential_type_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ensure_vehicle_credential_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path((vehicle_id, credential_type_id)): Path<(String, String)>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    let subject = CredentialSubject::Vehicle(VehicleId(vehicle_id));
    match service.ensure(subject, &CredentialTypeId(credential_type_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(credential_id): Path<String>,
    axum::Json(submission): axum::Json<CredentialSubmission>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.submit(&CredentialId(credential_id), submission) {
        Ok(record) => (StatusCode::ACCEPTED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    pub filename: String,
}

pub(crate) async fn upload_document_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(credential_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);

    match service.store_document(
        &CredentialId(credential_id),
        &query.filename,
        body.to_vec(),
        content_type,
    ) {
        Ok(stored) => (StatusCode::CREATED, axum::Json(stored)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignedUrlQuery {
    pub path: String,
}

pub(crate) async fn signed_url_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Query(query): Query<SignedUrlQuery>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.signed_url(&query.path) {
        Ok(signed) => (StatusCode::OK, axum::Json(signed)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Review request body: the acting reviewer plus the action-tagged decision.
#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub reviewer: String,
    #[serde(flatten)]
    pub action: ReviewAction,
}

pub(crate) async fn review_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(credential_id): Path<String>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.review(
        &CredentialId(credential_id),
        &request.reviewer,
        request.action,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
    Path(credential_id): Path<String>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.history(&CredentialId(credential_id)) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_queue_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.review_queue() {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_stats_handler<R, F, S>(
    State(service): State<Arc<CredentialService<R, F, S>>>,
) -> Response
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.review_stats() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}
