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

/// Top-level configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub transport: TransportConfig,
    pub directory: DirectoryConfig,
    pub notifier: NotifierConfig,
    pub geocoding: GeocodingConfig,
    pub sessions: SessionConfig,
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

        let bot_token = env::var("BOT_TOKEN").ok().filter(|token| !token.is_empty());
        let poll_timeout_secs = parse_u64_var("BOT_POLL_TIMEOUT_SECS", 25)?;

        let spreadsheet_id = env::var("GOOGLE_SHEETS_ID")
            .ok()
            .filter(|id| !id.is_empty());
        let credentials_path = env::var("GOOGLE_CREDENTIALS_PATH")
            .unwrap_or_else(|_| "./credentials/service-account.json".to_string());

        let manager_chat_id = match env::var("MANAGER_CHAT_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::InvalidManagerChat)?,
            ),
            _ => None,
        };

        let yandex_api_key = env::var("YANDEX_GEOCODING_API_KEY")
            .or_else(|_| env::var("YANDEX_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let inactivity_minutes = parse_u64_var("SESSION_INACTIVITY_MINUTES", 30)?;
        let sweep_seconds = parse_u64_var("SESSION_SWEEP_SECONDS", 60)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            transport: TransportConfig {
                bot_token,
                poll_timeout_secs,
            },
            directory: DirectoryConfig {
                spreadsheet_id,
                credentials_path,
            },
            notifier: NotifierConfig { manager_chat_id },
            geocoding: GeocodingConfig { yandex_api_key },
            sessions: SessionConfig {
                inactivity_minutes,
                sweep_seconds,
            },
        })
    }
}

fn parse_u64_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidDuration { name }),
        _ => Ok(default),
    }
}

/// Settings controlling the health endpoint binding.
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

/// Chat transport credential and long-poll tuning.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub bot_token: Option<String>,
    pub poll_timeout_secs: u64,
}

impl TransportConfig {
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.bot_token
            .as_deref()
            .ok_or(ConfigError::MissingBotToken)
    }
}

/// Spreadsheet-backed site directory settings.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub spreadsheet_id: Option<String>,
    pub credentials_path: String,
}

/// Staff notification channel.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub manager_chat_id: Option<i64>,
}

/// Geocoding provider credential.
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub yandex_api_key: Option<String>,
}

/// Session expiry tuning.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub inactivity_minutes: u64,
    pub sweep_seconds: u64,
}

impl SessionConfig {
    pub fn inactivity_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.inactivity_minutes as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_seconds.max(1))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidManagerChat,
    InvalidDuration { name: &'static str },
    MissingBotToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidManagerChat => {
                write!(f, "MANAGER_CHAT_ID must be a numeric chat identifier")
            }
            ConfigError::InvalidDuration { name } => {
                write!(f, "{name} must be a whole number")
            }
            ConfigError::MissingBotToken => write!(f, "BOT_TOKEN is not set"),
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "BOT_TOKEN",
            "BOT_POLL_TIMEOUT_SECS",
            "GOOGLE_SHEETS_ID",
            "GOOGLE_CREDENTIALS_PATH",
            "MANAGER_CHAT_ID",
            "YANDEX_GEOCODING_API_KEY",
            "YANDEX_API_KEY",
            "SESSION_INACTIVITY_MINUTES",
            "SESSION_SWEEP_SECONDS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.transport.bot_token.is_none());
        assert_eq!(config.sessions.inactivity_minutes, 30);
        assert_eq!(config.sessions.sweep_seconds, 60);
    }

    #[test]
    fn require_token_reports_missing_credential() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads");
        assert!(matches!(
            config.transport.require_token(),
            Err(ConfigError::MissingBotToken)
        ));
    }

    #[test]
    fn manager_chat_must_be_numeric() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MANAGER_CHAT_ID", "not-a-chat");
        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::InvalidManagerChat)));
        env::remove_var("MANAGER_CHAT_ID");
    }

    #[test]
    fn yandex_key_falls_back_to_legacy_variable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("YANDEX_API_KEY", "legacy-key");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.geocoding.yandex_api_key.as_deref(), Some("legacy-key"));
        env::remove_var("YANDEX_API_KEY");
    }
}
