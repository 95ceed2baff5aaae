use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub oracle: OracleConfig,
    pub reports: ReportStoreConfig,
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
        let log_json = match env::var("APP_LOG_JSON") {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => return Err(ConfigError::InvalidLogJson),
            },
            Err(_) => false,
        };

        let api_url = env::var("GROK_API_URL")
            .unwrap_or_else(|_| "https://api.x.ai/v1/chat/completions".to_string());
        let api_key = env::var("GROK_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let model = env::var("GROK_MODEL").unwrap_or_else(|_| "grok-4-latest".to_string());
        let timeout_secs = env::var("GROK_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let report_dir = env::var("EVALUATION_REPORT_DIR")
            .unwrap_or_else(|_| "evaluation_reports".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                json: log_json,
            },
            oracle: OracleConfig {
                api_url,
                api_key,
                model,
                timeout: Duration::from_secs(timeout_secs),
            },
            reports: ReportStoreConfig {
                directory: PathBuf::from(report_dir),
            },
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

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Emit JSON log lines instead of the compact human format.
    pub json: bool,
}

/// Connection settings for the scoring endpoint.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Per-call budget for one scoring request.
    pub timeout: Duration,
}

/// Where evaluation reports are archived.
#[derive(Debug, Clone)]
pub struct ReportStoreConfig {
    pub directory: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidLogJson,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "GROK_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidLogJson => write!(f, "APP_LOG_JSON must be a boolean flag"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidTimeout | ConfigError::InvalidLogJson => {
                None
            }
        }
    }
}
