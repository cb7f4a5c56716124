use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DEVELOPMENT_URL: &str = "http://localhost:8000";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a base url is required for the {0} environment")]
    MissingBaseUrl(Environment),
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub probe_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub health_path: String,
    /// `None` leaves the timeout to the transport.
    pub request_timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DEVELOPMENT_URL.to_string(),
            health_path: HEALTH_PATH.to_string(),
            request_timeout: None,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Resolves the base url for `env`, preferring an explicit override.
    pub fn for_environment(env: Environment, base_url: Option<String>) -> Result<Self, ConfigError> {
        let base_url = match (env, base_url) {
            (_, Some(url)) => url,
            (Environment::Development, None) => DEFAULT_DEVELOPMENT_URL.to_string(),
            (Environment::Production, None) => return Err(ConfigError::MissingBaseUrl(env)),
        };

        reqwest::Url::parse(&base_url).map_err(|err| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
