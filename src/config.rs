//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;
use crate::onboarding::TOTAL_STEPS;

/// Payment poller timing.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait between two status checks.
    pub interval: Duration,
    /// Hard cap on status checks, shared by pending responses and failures.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 10,
        }
    }
}

/// Third-party connection callback settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Integration name used in the backend callback path.
    pub provider: String,
    /// Onboarding step the user started the connection from.
    pub origin_step: u32,
    /// How long an error message stays up before redirecting.
    pub redirect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            provider: "instagram".to_string(),
            origin_step: 4,
            redirect_delay: Duration::from_millis(3000),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    pub api_url: String,
    /// Identity provider session-data endpoint.
    pub identity_url: String,
    /// Timeout applied to every remote request.
    pub request_timeout: Duration,
    /// Local database holding the persisted session token.
    pub db_path: PathBuf,
    pub poll: PollConfig,
    pub connection: ConnectionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            identity_url: "https://demobackend.emergentagent.com/auth/v1/env/oauth/session-data"
                .to_string(),
            request_timeout: Duration::from_secs(15),
            db_path: PathBuf::from("./data/onboard-callbacks.db"),
            poll: PollConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            api_url: std::env::var("ONBOARD_API_URL").unwrap_or(defaults.api_url),
            identity_url: std::env::var("ONBOARD_IDENTITY_URL").unwrap_or(defaults.identity_url),
            request_timeout: env_parse("ONBOARD_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            db_path: std::env::var("ONBOARD_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            poll: PollConfig {
                interval: env_parse("ONBOARD_POLL_INTERVAL_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.poll.interval),
                max_attempts: env_parse("ONBOARD_POLL_MAX_ATTEMPTS")
                    .unwrap_or(defaults.poll.max_attempts),
            },
            connection: ConnectionConfig {
                provider: std::env::var("ONBOARD_CONNECT_PROVIDER")
                    .unwrap_or(defaults.connection.provider),
                origin_step: env_parse("ONBOARD_CONNECT_ORIGIN_STEP")
                    .unwrap_or(defaults.connection.origin_step),
                redirect_delay: env_parse("ONBOARD_REDIRECT_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.connection.redirect_delay),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the orchestrators cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("ONBOARD_API_URL", &self.api_url),
            ("ONBOARD_IDENTITY_URL", &self.identity_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{value:?} is not a valid URL: {e}"),
            })?;
        }

        if self.poll.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARD_POLL_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if !(1..=TOTAL_STEPS).contains(&self.connection.origin_step) {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARD_CONNECT_ORIGIN_STEP".to_string(),
                message: format!("must be between 1 and {TOTAL_STEPS}"),
            });
        }

        if self.connection.provider.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARD_CONNECT_PROVIDER".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
