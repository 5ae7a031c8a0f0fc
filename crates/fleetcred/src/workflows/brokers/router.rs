use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::storage::DocumentStore;
use crate::workflows::credentials::CredentialRepository;
use crate::workflows::fleet::{DriverId, FleetRepository};

use super::domain::{AssignmentDecision, AssignmentId, BrokerId, RateUpdate, RequestedBy};
use super::repository::{BrokerRepository, RepositoryError};
use super::service::{BrokerService, BrokerServiceError};

/// Router builder exposing the trip-source listing, join flow, and rate
/// tables.
pub fn broker_router<B, R, F, S>(service: Arc<BrokerService<B, R, F, S>>) -> Router
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/drivers/:driver_id/brokers",
            get(driver_brokers_handler::<B, R, F, S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/brokers/:broker_id/join",
            post(join_handler::<B, R, F, S>),
        )
        .route(
            "/api/v1/assignments/:assignment_id/decide",
            post(decide_handler::<B, R, F, S>),
        )
        .route(
            "/api/v1/assignments/:assignment_id",
            delete(remove_handler::<B, R, F, S>),
        )
        .route(
            "/api/v1/brokers/:broker_id/rates",
            get(rates_handler::<B, R, F, S>).put(update_rates_handler::<B, R, F, S>),
        )
        .with_state(service)
}

fn error_response(error: BrokerServiceError) -> Response {
    let status = match &error {
        BrokerServiceError::UnknownBroker
        | BrokerServiceError::UnknownDriver
        | BrokerServiceError::UnknownAssignment
        | BrokerServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        BrokerServiceError::AlreadyAssigned
        | BrokerServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        BrokerServiceError::BrokerInactive
        | BrokerServiceError::JoinNotAllowed(_)
        | BrokerServiceError::NotEligible { .. }
        | BrokerServiceError::NotPending
        | BrokerServiceError::AlreadyRemoved
        | BrokerServiceError::InvalidBroker(_)
        | BrokerServiceError::InvalidRates(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BrokerServiceError::Credentials(_) | BrokerServiceError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn driver_brokers_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path(driver_id): Path<String>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.brokers_for_driver(&DriverId(driver_id)) {
        Ok(summaries) => (StatusCode::OK, axum::Json(summaries)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinRequest {
    pub requested_by: RequestedBy,
    pub actor: String,
}

pub(crate) async fn join_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path((driver_id, broker_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<JoinRequest>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.join(
        &DriverId(driver_id),
        &BrokerId(broker_id),
        request.requested_by,
        &request.actor,
    ) {
        Ok(assignment) => (StatusCode::CREATED, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecideRequest {
    pub decided_by: String,
    #[serde(flatten)]
    pub decision: AssignmentDecision,
}

pub(crate) async fn decide_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<DecideRequest>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.decide(
        &AssignmentId(assignment_id),
        &request.decided_by,
        request.decision,
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveRequest {
    pub removed_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) async fn remove_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<RemoveRequest>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.remove(
        &AssignmentId(assignment_id),
        &request.removed_by,
        request.reason,
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rates_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path(broker_id): Path<String>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.rates(&BrokerId(broker_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_rates_handler<B, R, F, S>(
    State(service): State<Arc<BrokerService<B, R, F, S>>>,
    Path(broker_id): Path<String>,
    axum::Json(update): axum::Json<RateUpdate>,
) -> Response
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    match service.update_rates(&BrokerId(broker_id), update) {
        Ok(rows) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Err(error) => error_response(error),
    }
}
