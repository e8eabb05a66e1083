//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variables understood for compatibility with older deployments,
/// mapped to their configuration keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("FUSION_BRAIN_API_URL", "remote.base_url"),
    ("FUSION_BRAIN_API_KEY", "remote.api_key"),
    ("FUSION_BRAIN_SECRET_KEY", "remote.api_secret"),
];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub callback: CallbackConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Remote generation service connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_remote_timeout() -> u64 {
    30000
}

fn default_connect_timeout() -> u64 {
    5000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_ms: default_remote_timeout(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Defaults applied to generation requests that do not specify them
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_num_images")]
    pub num_images: u32,
}

fn default_dimension() -> u32 {
    1024
}

fn default_num_images() -> u32 {
    1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            num_images: default_num_images(),
        }
    }
}

/// Poll scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Delay between polls while the remote job is still running
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Delay before retrying after a failed poll
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff_ms: u64,
    /// Consecutive poll failures after which a job is abandoned
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Move abandoned jobs to `failed` instead of leaving them `processing`
    #[serde(default)]
    pub mark_failed_on_exhaustion: bool,
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_failure_backoff() -> u64 {
    10000
}

fn default_max_failures() -> u32 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            failure_backoff_ms: default_failure_backoff(),
            max_failures: default_max_failures(),
            mark_failed_on_exhaustion: false,
        }
    }
}

/// Webhook delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackConfig {
    #[serde(default = "default_callback_timeout")]
    pub timeout_ms: u64,
    /// Keep the result payload on the job record so the status endpoint can serve it
    #[serde(default)]
    pub retain_result: bool,
}

fn default_callback_timeout() -> u64 {
    10000
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_callback_timeout(),
            retain_result: false,
        }
    }
}

/// How long finished jobs stay queryable
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_completed_ttl")]
    pub completed_ttl_secs: u64,
}

fn default_completed_ttl() -> u64 {
    3600
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            completed_ttl_secs: default_completed_ttl(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    10
}

fn default_burst() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from `RELAY_CONFIG` (or `config/default.toml`) and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/default.toml".into());
        Self::load_from_path(path)
    }

    /// Load settings from a specific configuration file path and the process environment
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Load settings from a file, overlaying the given environment variables.
    ///
    /// `RELAY__SECTION__KEY` variables override file values; the legacy
    /// `FUSION_BRAIN_*` and `PORT` variables override both.
    pub fn load_with_env<P: AsRef<Path>>(path: P, env: HashMap<String, String>) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            );

        // Blank legacy variables (e.g. from a copied .env template) do not override.
        let legacy = |var: &str| {
            env.get(var)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, legacy(*var))?;
        }

        if let Some(port) = legacy("PORT") {
            let port: u16 = port.parse().map_err(|_| {
                AppError::Config(config::ConfigError::Message(format!(
                    "PORT must be a valid port number, got '{}'",
                    port
                )))
            })?;
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(config_error("Server port cannot be 0"));
        }

        if self.remote.base_url.trim().is_empty() {
            return Err(config_error("Remote base URL must be set"));
        }
        if reqwest::Url::parse(&self.remote.base_url).is_err() {
            return Err(config_error(format!(
                "Remote base URL '{}' is not a valid URL",
                self.remote.base_url
            )));
        }
        if self.remote.api_key.is_empty() || self.remote.api_secret.is_empty() {
            return Err(config_error("Remote API key and secret must be set"));
        }

        if self.polling.max_failures == 0 {
            return Err(config_error("polling.max_failures must be at least 1"));
        }
        if self.polling.poll_interval_ms == 0 || self.polling.failure_backoff_ms == 0 {
            return Err(config_error("Polling intervals must be greater than zero"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.poll_interval_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.polling.failure_backoff_ms)
    }

    pub fn completed_ttl(&self) -> Duration {
        Duration::from_secs(self.retention.completed_ttl_secs)
    }
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            remote: RemoteConfig::default(),
            generation: GenerationConfig::default(),
            polling: PollingConfig::default(),
            callback: CallbackConfig::default(),
            retention: RetentionConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
