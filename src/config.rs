//! Configuration management for StudyBuddy
//!
//! Parses TOML configuration files, applies environment overrides and
//! provides typed access to settings. Every section has defaults, so the
//! service can start from environment variables alone.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Provider base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Free-tier model used when neither the config file nor `AI_MODEL` names one
pub const DEFAULT_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";

/// Upper bound for per-attempt provider timeouts (seconds)
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for retry attempts
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Upper bound for the first backoff delay (milliseconds)
const MAX_BASE_DELAY_MS: u64 = 60_000;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Which code path talks to the provider
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallPath {
    /// Raw chat-completions request over reqwest
    #[default]
    Direct,
    /// Streaming query through open-agent-sdk
    Agent,
}

impl CallPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPath::Direct => "direct",
            CallPath::Agent => "agent",
        }
    }
}

impl std::str::FromStr for CallPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "raw" => Ok(CallPath::Direct),
            "agent" => Ok(CallPath::Agent),
            other => Err(AppError::Config(format!(
                "unknown call path '{}', expected 'direct' or 'agent'",
                other
            ))),
        }
    }
}

/// Provider (OpenAI-compatible endpoint) configuration
///
/// Fields are private; use the accessors. The API key is never serialized so
/// that `studybuddy config` output and debug dumps cannot leak it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default, skip_serializing)]
    api_key: Option<String>,
    #[serde(default)]
    call_path: CallPath,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            call_path: CallPath::default(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ProviderConfig {
    /// Base URL without a trailing slash, e.g. `https://openrouter.ai/api/v1`
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Full chat-completions URL
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn call_path(&self) -> CallPath {
        self.call_path
    }

    /// Per-attempt timeout in seconds
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

/// Retry policy for transient provider failures
///
/// Validated at deserialization time: invalid values never produce an instance.
#[derive(Debug, Clone, Serialize)]
pub struct RetryConfig {
    max_attempts: u32,
    base_delay_ms: u64,
}

impl RetryConfig {
    /// Create a validated retry configuration
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is outside `1..=10` or `base_delay_ms`
    /// is outside `1..=60000`.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> AppResult<Self> {
        if max_attempts == 0 || max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(AppError::Config(format!(
                "retry.max_attempts must be between 1 and {}, got {}",
                MAX_RETRY_ATTEMPTS, max_attempts
            )));
        }
        if base_delay_ms == 0 || base_delay_ms > MAX_BASE_DELAY_MS {
            return Err(AppError::Config(format!(
                "retry.base_delay_ms must be between 1 and {}, got {}",
                MAX_BASE_DELAY_MS, base_delay_ms
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay_ms,
        })
    }

    /// Total attempts, including the first call
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry; doubles for each later retry
    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl<'de> Deserialize<'de> for RetryConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawRetryConfig {
            max_attempts: Option<u32>,
            base_delay_ms: Option<u64>,
        }

        let raw = RawRetryConfig::deserialize(deserializer)?;
        let defaults = RetryConfig::default();
        RetryConfig::new(
            raw.max_attempts.unwrap_or(defaults.max_attempts),
            raw.base_delay_ms.unwrap_or(defaults.base_delay_ms),
        )
        .map_err(|e| serde::de::Error::custom(format!("Invalid retry configuration: {}", e)))
    }
}

/// Cross-origin request configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Allowed origins; a single `*` allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl CorsConfig {
    /// True when every origin is allowed
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file and validate it
    ///
    /// Environment overrides are not applied; see [`Config::load`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();
        let config = Self::read_file(path.as_ref())?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load configuration the way the server does at startup
    ///
    /// 1. Parse `path` if the file exists, otherwise start from defaults
    /// 2. Apply environment overrides from the process environment
    /// 3. Validate
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        let mut config = if path.exists() {
            Self::read_file(path)?
        } else {
            tracing::info!(
                path = %path_display,
                "Config file not found, using defaults and environment"
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    fn read_file(path: &Path) -> AppResult<Self> {
        let path_display = path.display().to_string();

        let content =
            std::fs::read_to_string(path).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
            path: path_display,
            source,
        })
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Recognized variables: `OPENROUTER_API_KEY`, `AI_MODEL`, `CORS_ORIGINS`
    /// (comma separated), `PORT`, `STUDYBUDDY_CALL_PATH`. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.provider.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = get("AI_MODEL") {
            self.provider.model = model.trim().to_string();
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(port) = get("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                AppError::Config(format!("PORT must be a valid port number, got '{}'", port))
            })?;
        }
        if let Some(path) = get("STUDYBUDDY_CALL_PATH") {
            self.provider.call_path = path.parse()?;
        }
        Ok(())
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> AppResult<()> {
        let base_url = self.provider.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "provider.base_url must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        if self.provider.model.trim().is_empty() {
            return Err(AppError::Config(
                "provider.model cannot be empty".to_string(),
            ));
        }

        let timeout = self.provider.timeout_seconds;
        if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "provider.timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, timeout
            )));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(AppError::Config(
                "cors.allowed_origins cannot be empty (use \"*\" to allow any origin)"
                    .to_string(),
            ));
        }
        for origin in &self.cors.allowed_origins {
            if origin != "*" && !(origin.starts_with("http://") || origin.starts_with("https://"))
            {
                return Err(AppError::Config(format!(
                    "cors.allowed_origins entry '{}' must be \"*\" or start with http:// or https://",
                    origin
                )));
            }
        }

        Ok(())
    }
}
