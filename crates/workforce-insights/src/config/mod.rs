use crate::analytics::outliers::{
    DetectionConfig, DetectionMethod, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SENSITIVITY_THRESHOLD,
};
use crate::recommendations::{HttpRecommendationProvider, RecommendationGateway};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_AI_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 60;

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
    pub analytics: AnalyticsConfig,
    pub ai: AiConfig,
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

        let idle_minutes = parse_var("APP_SESSION_IDLE_MINUTES", DEFAULT_SESSION_IDLE_MINUTES)?;
        if idle_minutes == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "APP_SESSION_IDLE_MINUTES",
                value: idle_minutes.to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                session_idle: Duration::from_secs(idle_minutes.saturating_mul(60)),
            },
            telemetry: TelemetryConfig { log_level },
            analytics: AnalyticsConfig::from_env()?,
            ai: AiConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Analysis sessions unused for this long are torn down.
    pub session_idle: Duration,
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

/// Server-side detection defaults; request bodies override them field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub method: DetectionMethod,
    pub sensitivity_threshold: f64,
    pub confidence_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::default(),
            sensitivity_threshold: DEFAULT_SENSITIVITY_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl AnalyticsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let method = match env::var("INSIGHTS_DETECTION_METHOD") {
            Ok(raw) => DetectionMethod::parse(&raw)
                .ok_or(ConfigError::InvalidDetectionMethod { value: raw })?,
            Err(_) => DetectionMethod::default(),
        };

        let sensitivity_threshold = parse_var(
            "INSIGHTS_SENSITIVITY_THRESHOLD",
            DEFAULT_SENSITIVITY_THRESHOLD,
        )?;
        if !(sensitivity_threshold.is_finite() && sensitivity_threshold > 0.0) {
            return Err(ConfigError::InvalidNumber {
                var: "INSIGHTS_SENSITIVITY_THRESHOLD",
                value: sensitivity_threshold.to_string(),
            });
        }

        let confidence_threshold =
            parse_var("INSIGHTS_CONFIDENCE_THRESHOLD", DEFAULT_CONFIDENCE_THRESHOLD)?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ConfigError::InvalidNumber {
                var: "INSIGHTS_CONFIDENCE_THRESHOLD",
                value: confidence_threshold.to_string(),
            });
        }

        Ok(Self {
            method,
            sensitivity_threshold,
            confidence_threshold,
        })
    }

    /// Detection config with these defaults and no metrics selected yet.
    pub fn detection_defaults(&self) -> DetectionConfig {
        DetectionConfig::default()
            .with_method(self.method)
            .with_sensitivity(self.sensitivity_threshold)
            .with_confidence_threshold(Some(self.confidence_threshold))
    }
}

/// Connection to the recommendation collaborator. No endpoint means fallback only.
#[derive(Clone)]
pub struct AiConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout: Duration::from_millis(DEFAULT_AI_TIMEOUT_MS),
        }
    }
}

impl AiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_ms = parse_var("INSIGHTS_AI_TIMEOUT_MS", DEFAULT_AI_TIMEOUT_MS)?;

        Ok(Self {
            endpoint: non_empty_var("INSIGHTS_AI_ENDPOINT"),
            api_key: non_empty_var("INSIGHTS_AI_API_KEY"),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn gateway(&self) -> RecommendationGateway {
        let gateway = match &self.endpoint {
            Some(endpoint) => RecommendationGateway::new(Arc::new(
                HttpRecommendationProvider::new(endpoint.clone(), self.api_key.clone()),
            )),
            None => RecommendationGateway::unconfigured(),
        };
        gateway.with_timeout(self.timeout)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            var: name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str, value: String },
    InvalidDetectionMethod { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} has an out-of-range or non-numeric value '{value}'")
            }
            ConfigError::InvalidDetectionMethod { value } => write!(
                f,
                "INSIGHTS_DETECTION_METHOD must be zscore, iqr or isolation_forest_proxy \
                 (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidDetectionMethod { .. } => None,
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
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_SESSION_IDLE_MINUTES",
            "INSIGHTS_AI_ENDPOINT",
            "INSIGHTS_AI_API_KEY",
            "INSIGHTS_AI_TIMEOUT_MS",
            "INSIGHTS_DETECTION_METHOD",
            "INSIGHTS_SENSITIVITY_THRESHOLD",
            "INSIGHTS_CONFIDENCE_THRESHOLD",
        ] {
            env::remove_var(var);
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
        assert_eq!(config.server.session_idle, Duration::from_secs(3600));
        assert_eq!(config.analytics, AnalyticsConfig::default());
        assert_eq!(config.ai.endpoint, None);
        assert_eq!(config.ai.timeout, Duration::from_millis(15_000));
        assert!(!config.ai.gateway().is_configured());
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
    fn detection_overrides_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INSIGHTS_DETECTION_METHOD", "iqr");
        env::set_var("INSIGHTS_SENSITIVITY_THRESHOLD", "1.5");
        env::set_var("INSIGHTS_CONFIDENCE_THRESHOLD", "0.5");
        env::set_var("INSIGHTS_AI_ENDPOINT", "http://127.0.0.1:9/recommend");
        env::set_var("INSIGHTS_AI_TIMEOUT_MS", "250");

        let config = AppConfig::load().expect("config loads");
        let detection = config.analytics.detection_defaults();
        assert_eq!(detection.method, DetectionMethod::Iqr);
        assert_eq!(detection.sensitivity_threshold, 1.5);
        assert_eq!(detection.confidence_threshold, Some(0.5));
        let gateway = config.ai.gateway();
        assert!(gateway.is_configured());
        assert_eq!(gateway.timeout(), Duration::from_millis(250));
        reset_env();
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INSIGHTS_CONFIDENCE_THRESHOLD", "1.7");
        let err = AppConfig::load().expect_err("out of range");
        assert!(err.to_string().contains("INSIGHTS_CONFIDENCE_THRESHOLD"));

        reset_env();
        env::set_var("APP_SESSION_IDLE_MINUTES", "0");
        let err = AppConfig::load().expect_err("zero idle window");
        assert!(err.to_string().contains("APP_SESSION_IDLE_MINUTES"));

        reset_env();
        env::set_var("INSIGHTS_DETECTION_METHOD", "lof");
        let err = AppConfig::load().expect_err("unknown method");
        assert!(matches!(err, ConfigError::InvalidDetectionMethod { .. }));
        reset_env();
    }
}
