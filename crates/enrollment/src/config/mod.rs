use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
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

/// Top-level configuration for the enrollment service and wizard clients.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub eligibility: EligibilityConfig,
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
        let format = match environment {
            AppEnvironment::Development => LogFormat::Pretty,
            AppEnvironment::Test | AppEnvironment::Production => LogFormat::Compact,
        };

        let base_url = env::var("ENROLLMENT_BACKEND_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{port}"));
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBackendUrl(base_url));
        }
        let timeout_secs = parse_number("ENROLLMENT_BACKEND_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "ENROLLMENT_BACKEND_TIMEOUT_SECS",
            });
        }

        let min_age = parse_age("ENROLLMENT_MIN_AGE", 18)?;
        let max_age = parse_age("ENROLLMENT_MAX_AGE", 32)?;
        if min_age > max_age {
            return Err(ConfigError::InvertedAgeRange { min_age, max_age });
        }
        let convocatoria =
            env::var("ENROLLMENT_CONVOCATORIA").unwrap_or_else(|_| "2025".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            backend: BackendConfig {
                base_url,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            eligibility: EligibilityConfig {
                min_age,
                max_age,
                convocatoria,
            },
        })
    }
}

fn parse_number(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_age(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let value = parse_number(key, u64::from(default))?;
    u32::try_from(value).map_err(|_| ConfigError::InvalidNumber { key })
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where the wizard persists progress and how long a single call may take.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Age window and the call (`convocatoria`) applications are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityConfig {
    pub min_age: u32,
    pub max_age: u32,
    pub convocatoria: String,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_age: 18,
            max_age: 32,
            convocatoria: "2025".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBackendUrl(String),
    InvalidNumber { key: &'static str },
    InvertedAgeRange { min_age: u32, max_age: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBackendUrl(url) => write!(
                f,
                "ENROLLMENT_BACKEND_URL must start with http:// or https:// (found '{url}')"
            ),
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
            ConfigError::InvertedAgeRange { min_age, max_age } => write!(
                f,
                "ENROLLMENT_MIN_AGE ({min_age}) must not exceed ENROLLMENT_MAX_AGE ({max_age})"
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "ENROLLMENT_BACKEND_URL",
            "ENROLLMENT_BACKEND_TIMEOUT_SECS",
            "ENROLLMENT_MIN_AGE",
            "ENROLLMENT_MAX_AGE",
            "ENROLLMENT_CONVOCATORIA",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.backend.request_timeout, Duration::from_secs(30));
        assert_eq!(config.eligibility, EligibilityConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_inverted_age_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENROLLMENT_MIN_AGE", "40");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvertedAgeRange {
                min_age: 40,
                max_age: 32
            })
        ));
    }

    #[test]
    fn rejects_ages_beyond_u32() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENROLLMENT_MIN_AGE", "4294967297");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber {
                key: "ENROLLMENT_MIN_AGE"
            })
        ));
    }

    #[test]
    fn rejects_backend_url_without_scheme() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ENROLLMENT_BACKEND_URL", "backend.local:8080");
        let result = AppConfig::load();
        reset_env();
        assert!(matches!(result, Err(ConfigError::InvalidBackendUrl(_))));
    }
}
