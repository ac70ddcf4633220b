use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::credit::model::DEFAULT_MINIMUM_VERSION;
use crate::credit::{ScoringOptions, DEFAULT_BATCH_CONCURRENCY, DEFAULT_TOP_K};

const DEFAULT_MODEL_PATH: &str = "models/paygo-credit-logistic.json";
const DEFAULT_SCORE_TIMEOUT_MS: u64 = 2_000;

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
    pub scoring: ScoringConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Model artifact location and scoring limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub model_path: PathBuf,
    pub minimum_model_version: u32,
    pub explanation_top_k: usize,
    pub score_timeout: Duration,
    pub batch_concurrency: usize,
    /// Optional CSV export seeding the customer repository.
    pub customer_data: Option<PathBuf>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            minimum_model_version: DEFAULT_MINIMUM_VERSION,
            explanation_top_k: DEFAULT_TOP_K,
            score_timeout: Duration::from_millis(DEFAULT_SCORE_TIMEOUT_MS),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            customer_data: None,
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let model_path = env::var("CREDIT_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let minimum_model_version = match env::var("CREDIT_MODEL_MIN_VERSION") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidModelVersion)?,
            Err(_) => defaults.minimum_model_version,
        };

        let explanation_top_k = match env::var("CREDIT_EXPLANATION_TOP_K") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidTopK),
            },
            Err(_) => defaults.explanation_top_k,
        };

        let score_timeout = match env::var("CREDIT_SCORE_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::InvalidTimeout),
            },
            Err(_) => defaults.score_timeout,
        };

        let batch_concurrency = match env::var("CREDIT_BATCH_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidBatchConcurrency),
            },
            Err(_) => defaults.batch_concurrency,
        };

        let customer_data = env::var("CREDIT_CUSTOMER_DATA")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            model_path,
            minimum_model_version,
            explanation_top_k,
            score_timeout,
            batch_concurrency,
            customer_data,
        })
    }
}

impl From<&ScoringConfig> for ScoringOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            explanation_top_k: config.explanation_top_k,
            score_timeout: config.score_timeout,
            model_path: Some(config.model_path.clone()),
            batch_concurrency: config.batch_concurrency,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidModelVersion,
    InvalidTopK,
    InvalidTimeout,
    InvalidBatchConcurrency,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidModelVersion => {
                write!(f, "CREDIT_MODEL_MIN_VERSION must be a non-negative integer")
            }
            ConfigError::InvalidTopK => {
                write!(f, "CREDIT_EXPLANATION_TOP_K must be a positive integer")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "CREDIT_SCORE_TIMEOUT_MS must be a positive number of milliseconds")
            }
            ConfigError::InvalidBatchConcurrency => {
                write!(f, "CREDIT_BATCH_CONCURRENCY must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidModelVersion
            | ConfigError::InvalidTopK
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidBatchConcurrency => None,
        }
    }
}
