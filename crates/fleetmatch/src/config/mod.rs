use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::gateway::GatewaySettings;

/// Distinguishes runtime behavior for different stages of the service.
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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub gateway: GatewayConfig,
    pub providers: Vec<LlmProviderConfig>,
    pub embedding: EmbeddingConfig,
    pub eligibility: EligibilitySettings,
    pub catalog_csv: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let gateway = GatewayConfig {
            failure_threshold: parse_var("MATCH_GATEWAY_FAILURE_THRESHOLD", 3)?,
            cooldown_secs: parse_var("MATCH_GATEWAY_COOLDOWN_SECS", 60)?,
            max_retries: parse_var("MATCH_GATEWAY_MAX_RETRIES", 2)?,
            base_delay_ms: parse_var("MATCH_GATEWAY_BASE_DELAY_MS", 500)?,
            timeout_secs: parse_var("MATCH_GATEWAY_TIMEOUT_SECS", 15)?,
            max_concurrency: parse_var("MATCH_GATEWAY_MAX_CONCURRENCY", 10)?,
        };

        let providers = load_providers()?;

        let embedding = EmbeddingConfig {
            url: optional_var("MATCH_EMBEDDING_URL"),
            model: env::var("MATCH_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            api_key: optional_var("MATCH_EMBEDDING_API_KEY"),
            dimensions: parse_var("MATCH_EMBEDDING_DIMENSIONS", 256)?,
        };

        let eligibility = EligibilitySettings {
            min_doors: parse_var("MATCH_MIN_DOORS", 4)?,
            ruleset_ttl_hours: parse_var("MATCH_RULESET_TTL_HOURS", 24 * 7)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            gateway,
            providers,
            embedding,
            eligibility,
            catalog_csv: optional_var("MATCH_CATALOG_CSV").map(PathBuf::from),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Resilience dials for the generative gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

impl GatewayConfig {
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            failure_threshold: self.failure_threshold.max(1),
            cooldown: Duration::from_secs(self.cooldown_secs),
            max_retries: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_concurrency: self.max_concurrency.max(1),
        }
    }
}

/// One OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct LlmProviderConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub priority: u8,
    pub enabled: bool,
}

impl fmt::Debug for LlmProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Remote embedding endpoint; the hashing embedder is used when `url` is unset.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilitySettings {
    pub min_doors: u8,
    pub ruleset_ttl_hours: i64,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn load_providers() -> Result<Vec<LlmProviderConfig>, ConfigError> {
    let Some(names) = optional_var("MATCH_LLM_PROVIDERS") else {
        return Ok(Vec::new());
    };

    let mut providers = Vec::new();
    for (position, name) in names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .enumerate()
    {
        let prefix = format!("MATCH_LLM_{}", name.to_ascii_uppercase().replace('-', "_"));
        let base_url = optional_var(&format!("{prefix}_BASE_URL"))
            .ok_or_else(|| ConfigError::MissingProviderUrl(name.to_string()))?;
        let default_priority = u8::try_from(position).unwrap_or(u8::MAX);

        providers.push(LlmProviderConfig {
            name: name.to_string(),
            base_url,
            api_key: optional_var(&format!("{prefix}_API_KEY")),
            model: optional_var(&format!("{prefix}_MODEL"))
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            priority: parse_var(&format!("{prefix}_PRIORITY"), default_priority)?,
            enabled: parse_var(&format!("{prefix}_ENABLED"), true)?,
        });
    }

    Ok(providers)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: String, value: String },
    MissingProviderUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::MissingProviderUrl(name) => {
                write!(f, "provider '{name}' is listed but has no base URL configured")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingProviderUrl(_) => None,
        }
    }
}
