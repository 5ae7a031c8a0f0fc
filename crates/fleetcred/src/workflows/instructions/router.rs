use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::GenerationRequest;
use super::gateway::ChatModelGateway;
use super::service::{AccessTokenVerifier, GenerationError, InstructionService};

/// Router builder exposing the instruction generation endpoint.
pub fn instruction_router<G, V>(service: Arc<InstructionService<G, V>>) -> Router
where
    G: ChatModelGateway + 'static,
    V: AccessTokenVerifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/instructions/generate",
            post(generate_handler::<G, V>),
        )
        .with_state(service)
}

fn error_response(error: GenerationError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub(crate) async fn generate_handler<G, V>(
    State(service): State<Arc<InstructionService<G, V>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<GenerationRequest>,
) -> Response
where
    G: ChatModelGateway + 'static,
    V: AccessTokenVerifier + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return unauthorized("missing bearer token");
    };
    if !service.verify_token(token) {
        return unauthorized("access token was not accepted");
    }
    match service.generate(request).await {
        Ok(reply) => (StatusCode::OK, axum::Json(reply)).into_response(),
        Err(error) => error_response(error),
    }
}
