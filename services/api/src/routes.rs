use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use fleetcred::storage::DocumentStore;
use fleetcred::workflows::brokers::{broker_router, BrokerRepository, BrokerService};
use fleetcred::workflows::credentials::{
    credential_router, CredentialRepository, CredentialService,
};
use fleetcred::workflows::fleet::FleetRepository;
use fleetcred::workflows::instructions::{
    instruction_router, AccessTokenVerifier, ChatModelGateway, InstructionService,
};
use serde_json::json;
use std::sync::Arc;

/// Compose the full HTTP surface: credential and broker workflows, the
/// instruction builder when a model gateway is configured, and the
/// operational endpoints.
pub(crate) fn with_platform_routes<R, F, S, B, G, V>(
    credentials: Arc<CredentialService<R, F, S>>,
    brokers: Arc<BrokerService<B, R, F, S>>,
    instructions: Option<Arc<InstructionService<G, V>>>,
) -> axum::Router
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
    B: BrokerRepository + 'static,
    G: ChatModelGateway + 'static,
    V: AccessTokenVerifier + 'static,
{
    let mut app = credential_router(credentials).merge(broker_router(brokers));
    if let Some(service) = instructions {
        app = app.merge(instruction_router(service));
    }
    app.route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
