use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;

/// Deployment stage the process runs in. Anything unrecognized counts as
/// development so a bare checkout runs without ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the service reads from the process environment, grouped by the
/// subsystem that consumes it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Reads every section, applying defaults for anything unset. A `.env`
    /// file is honored when present so local runs need no exported vars.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        Ok(Self {
            environment,
            server: server_from_env()?,
            telemetry: telemetry_from_env(),
            model: model_from_env()?,
            auth: auth_from_env(),
        })
    }
}

fn server_from_env() -> Result<ServerConfig, ConfigError> {
    let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("APP_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort)?;

    Ok(ServerConfig { host, port })
}

fn telemetry_from_env() -> TelemetryConfig {
    TelemetryConfig {
        log_level: env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
    }
}

fn model_from_env() -> Result<ModelConfig, ConfigError> {
    let api_key = env::var("OPENAI_API_KEY").ok().map(SecretString::from);
    let model_name = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let base_url =
        env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let generation_tokens = env::var("GENERATION_TOKENS")
        .unwrap_or_else(|_| "4000".to_string())
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidTokenCeiling)?;

    Ok(ModelConfig {
        api_key,
        model_name,
        base_url,
        generation_tokens,
    })
}

fn auth_from_env() -> AuthConfig {
    let builder_tokens = env::var("BUILDER_ACCESS_TOKENS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    AuthConfig { builder_tokens }
}

/// HTTP bind settings. `localhost` is accepted as an alias for 127.0.0.1;
/// any other host must be a literal IP.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Log filtering for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the outbound chat-model gateway used by instruction generation.
///
/// A missing API key is not a startup failure: the serve path only needs the
/// gateway when the generation endpoint is mounted with a live client.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: Option<SecretString>,
    pub model_name: String,
    pub base_url: String,
    pub generation_tokens: u32,
}

/// Bearer tokens accepted by the instruction-builder endpoint.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub builder_tokens: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidTokenCeiling,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT is not a valid TCP port"),
            ConfigError::InvalidTokenCeiling => {
                write!(f, "GENERATION_TOKENS must be a positive integer")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST is neither 'localhost' nor a literal IP address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTokenCeiling => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
