use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::intake::{
    UploadConstraints, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES,
};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

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
    pub upload: UploadConfig,
    pub integrations: IntegrationConfig,
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

        let max_bytes = match optional_var("APP_UPLOAD_MAX_BYTES") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidUploadLimit { value: raw }),
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let allowed_extensions = match env::var("APP_UPLOAD_EXTENSIONS") {
            Ok(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::EmptyExtensionList);
                }
                parsed
            }
            Err(_) => DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        };

        let timeout_secs = match optional_var("APP_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout { value: raw }),
            },
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            upload: UploadConfig {
                max_bytes,
                allowed_extensions,
            },
            integrations: IntegrationConfig {
                document_store_url: optional_var("APP_DOCUMENT_STORE_URL"),
                intake_url: optional_var("APP_INTAKE_URL"),
                http_timeout: Duration::from_secs(timeout_secs),
                catalog_csv: optional_var("APP_CATALOG_CSV").map(PathBuf::from),
            },
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
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

/// Limits applied to every document upload before any bytes leave the process.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    pub fn constraints(&self) -> UploadConstraints {
        UploadConstraints::new(self.allowed_extensions.iter().cloned(), self.max_bytes)
    }
}

/// Remote collaborators; unset URLs fall back to the in-process implementations.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    pub document_store_url: Option<String>,
    pub intake_url: Option<String>,
    pub http_timeout: Duration,
    pub catalog_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUploadLimit { value: String },
    EmptyExtensionList,
    InvalidTimeout { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUploadLimit { value } => write!(
                f,
                "APP_UPLOAD_MAX_BYTES must be a positive byte count, got '{}'",
                value
            ),
            ConfigError::EmptyExtensionList => {
                write!(f, "APP_UPLOAD_EXTENSIONS must list at least one extension")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "APP_HTTP_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidUploadLimit { .. }
            | ConfigError::EmptyExtensionList
            | ConfigError::InvalidTimeout { .. } => None,
        }
    }
}
