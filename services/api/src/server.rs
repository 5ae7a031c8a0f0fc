use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryBrokerRepository, InMemoryCredentialRepository, InMemoryDocumentStore,
    InMemoryFleetRepository, StaticTokenVerifier,
};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleetcred::config::AppConfig;
use fleetcred::error::AppError;
use fleetcred::telemetry;
use fleetcred::workflows::brokers::BrokerService;
use fleetcred::workflows::credentials::CredentialService;
use fleetcred::workflows::instructions::{InstructionService, OpenAiChatGateway};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryCredentialRepository::default());
    let fleet = Arc::new(InMemoryFleetRepository::default());
    let store = Arc::new(InMemoryDocumentStore::default());
    let credentials = Arc::new(CredentialService::new(repository, fleet.clone(), store));
    let brokers = Arc::new(BrokerService::new(
        Arc::new(InMemoryBrokerRepository::default()),
        credentials.clone(),
        fleet,
    ));

    let instructions = config.model.api_key.take().map(|api_key| {
        let gateway = Arc::new(OpenAiChatGateway::new(
            api_key,
            config.model.base_url.clone(),
            config.model.model_name.clone(),
        ));
        let verifier = Arc::new(StaticTokenVerifier::new(config.auth.builder_tokens.clone()));
        Arc::new(
            InstructionService::new(gateway, verifier)
                .with_generation_tokens(config.model.generation_tokens),
        )
    });
    if instructions.is_none() {
        info!("OPENAI_API_KEY is not set; instruction generation endpoint disabled");
    } else if config.auth.builder_tokens.is_empty() {
        warn!("BUILDER_ACCESS_TOKENS is empty; generation requests will all be rejected");
    }

    let app = with_platform_routes(credentials, brokers, instructions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::io("binding the listener", source))?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "fleet credentialing service ready");

    axum::serve(listener, app)
        .await
        .map_err(|source| AppError::io("serving connections", source))?;
    Ok(())
}
