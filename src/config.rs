use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

/// Environment variable holding the token signing secret.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unsupported signing algorithm: {0}")]
    Algorithm(String),

    #[error("Invalid argon2 work factor: {0}")]
    WorkFactor(String),

    #[error("auth.max_sessions_per_user must be at least 1")]
    SessionCap,

    #[error("No signing secret configured (set {SECRET_KEY_ENV} or auth.secret_key)")]
    MissingSecret,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. Without it the service keeps users and
    /// sessions in memory and the content routes stay disabled.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Token and session settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// Fallback signing secret; `SECRET_KEY` wins when both are set.
    #[serde(default)]
    pub secret_key: Option<String>,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    /// Re-check signature and expiry of a stored refresh token before use.
    pub verify_refresh_tokens: bool,
    /// Oldest sessions beyond this count are dropped on login.
    #[serde(default)]
    pub max_sessions_per_user: Option<u32>,
    /// Period of the expired-session sweep. Disabled when absent.
    #[serde(default)]
    pub session_sweep_interval_secs: Option<u64>,
    pub prehash_passwords: bool,
    #[serde(default)]
    pub argon2: Argon2Config,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 60,
            refresh_token_expire_days: 7,
            verify_refresh_tokens: true,
            max_sessions_per_user: None,
            session_sweep_interval_secs: None,
            prehash_passwords: true,
            argon2: Argon2Config::default(),
        }
    }
}

/// Argon2id work factor.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub lanes: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        // argon2 crate defaults (m=19 MiB, t=2, p=1)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            lanes: 1,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl AuthConfig {
    /// Resolve the signing secret: environment first, then YAML.
    pub fn resolve_secret(&self) -> Result<String, ConfigError> {
        std::env::var(SECRET_KEY_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.secret_key.clone().filter(|s| !s.is_empty()))
            .ok_or(ConfigError::MissingSecret)
    }
}
