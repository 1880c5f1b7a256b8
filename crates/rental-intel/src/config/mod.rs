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
    pub market: MarketConfig,
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
            market: MarketConfig::from_env()?,
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

/// Which adapter supplies external market snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketSourceMode {
    Fixture,
    Http { base_url: String },
    Csv { path: PathBuf },
}

/// Cache lifetimes, fetch limits, and source selection for the market engine.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub source: MarketSourceMode,
    pub fetch_timeout: Duration,
    pub snapshot_ttl_hours: i64,
    pub analysis_ttl_minutes: i64,
    pub match_ttl_minutes: i64,
    pub region: String,
    pub period: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            source: MarketSourceMode::Fixture,
            fetch_timeout: Duration::from_secs(10),
            snapshot_ttl_hours: 24,
            analysis_ttl_minutes: 240,
            match_ttl_minutes: 5,
            region: "UK".to_string(),
            period: "latest".to_string(),
        }
    }
}

impl MarketConfig {
    /// Snapshot lifetime; values set in code are clamped like env values.
    pub fn snapshot_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.snapshot_ttl_hours.clamp(1, MAX_TTL_HOURS))
    }

    pub fn analysis_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.analysis_ttl_minutes.clamp(1, MAX_TTL_MINUTES))
    }

    pub fn match_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.match_ttl_minutes.clamp(1, MAX_TTL_MINUTES))
    }

    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let source = match env::var("MARKET_SOURCE")
            .unwrap_or_else(|_| "fixture".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "http" => {
                let base_url = env::var("MARKET_SOURCE_URL")
                    .map_err(|_| ConfigError::MissingVar("MARKET_SOURCE_URL"))?;
                MarketSourceMode::Http { base_url }
            }
            "csv" => {
                let path = env::var("MARKET_SOURCE_CSV")
                    .map_err(|_| ConfigError::MissingVar("MARKET_SOURCE_CSV"))?;
                MarketSourceMode::Csv {
                    path: PathBuf::from(path),
                }
            }
            "fixture" => MarketSourceMode::Fixture,
            other => return Err(ConfigError::UnknownSource(other.to_string())),
        };

        let fetch_timeout_secs =
            numeric_var("MARKET_FETCH_TIMEOUT_SECS", 10, MAX_FETCH_TIMEOUT_SECS)?;

        Ok(Self {
            source,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs as u64),
            snapshot_ttl_hours: numeric_var(
                "MARKET_SNAPSHOT_TTL_HOURS",
                defaults.snapshot_ttl_hours,
                MAX_TTL_HOURS,
            )?,
            analysis_ttl_minutes: numeric_var(
                "MARKET_ANALYSIS_TTL_MINUTES",
                defaults.analysis_ttl_minutes,
                MAX_TTL_MINUTES,
            )?,
            match_ttl_minutes: numeric_var(
                "MARKET_MATCH_TTL_MINUTES",
                defaults.match_ttl_minutes,
                MAX_TTL_MINUTES,
            )?,
            region: env::var("MARKET_REGION").unwrap_or(defaults.region),
            period: env::var("MARKET_PERIOD").unwrap_or(defaults.period),
        })
    }
}

/// Cache lifetimes are capped at one year so they always fit a chrono `Duration`.
pub const MAX_TTL_HOURS: i64 = 24 * 365;
pub const MAX_TTL_MINUTES: i64 = MAX_TTL_HOURS * 60;
const MAX_FETCH_TIMEOUT_SECS: i64 = 3_600;

fn numeric_var(name: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidNumber(name))?;
            if value > max {
                return Err(ConfigError::NumberTooLarge { name, max });
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber(&'static str),
    NumberTooLarge { name: &'static str, max: i64 },
    MissingVar(&'static str),
    UnknownSource(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber(name) => write!(f, "{name} must be a positive integer"),
            ConfigError::NumberTooLarge { name, max } => {
                write!(f, "{name} must not exceed {max}")
            }
            ConfigError::MissingVar(name) => {
                write!(f, "{name} is required for the selected market source")
            }
            ConfigError::UnknownSource(value) => write!(
                f,
                "MARKET_SOURCE '{value}' is not one of fixture, http, csv"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
