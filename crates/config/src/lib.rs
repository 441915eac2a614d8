//! Configuration loading, validation, and management for CloudClaw.
//!
//! Loads configuration from `~/.cloudclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cloudclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Text-generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model name passed to the provider
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response (unset = provider default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Orchestration loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool backends
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "granite3.1".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Tool-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool executions allowed per user message
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Per-call tool timeout
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    #[serde(default = "default_start_marker")]
    pub tool_start_marker: String,

    #[serde(default = "default_end_marker")]
    pub tool_end_marker: String,

    /// Replace the built-in persona entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_tool_iterations() -> usize {
    5
}
fn default_tool_timeout_secs() -> u64 {
    60
}
fn default_start_marker() -> String {
    "---TOOL_START---".into()
}
fn default_end_marker() -> String {
    "---TOOL_END---".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            tool_timeout_secs: default_tool_timeout_secs(),
            tool_start_marker: default_start_marker(),
            tool_end_marker: default_end_marker(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Longest accepted chat message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Events buffered between the turn task and the HTTP body
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    5001
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_max_message_chars() -> usize {
    1000
}
fn default_stream_buffer() -> usize {
    8
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_message_chars: default_max_message_chars(),
            stream_buffer: default_stream_buffer(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Where tools come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Base URL of the AWS automation API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_api_url: Option<String>,

    /// Base URL of a remote tool server (`GET /tools`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,

    /// HTTP timeout for tool backends
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Register built-in tools (`get_current_time`)
    #[serde(default = "default_true")]
    pub enable_builtin: bool,
}

fn default_request_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            aws_api_url: Some(DEFAULT_AWS_API_URL.into()),
            catalog_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            enable_builtin: true,
        }
    }
}

/// Default address of the AWS automation API.
pub const DEFAULT_AWS_API_URL: &str = "http://localhost:5000";

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.cloudclaw/config.toml).
    ///
    /// Environment overrides, highest priority:
    /// - `CLOUDCLAW_API_KEY`
    /// - `CLOUDCLAW_PROVIDER`
    /// - `CLOUDCLAW_MODEL`, then `OLLAMA_MODEL`
    /// - `AWS_API_BASE_URL`
    /// - `CLOUDCLAW_HOST`, `CLOUDCLAW_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(key) = var("CLOUDCLAW_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(provider) = var("CLOUDCLAW_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = var("CLOUDCLAW_MODEL").or_else(|| var("OLLAMA_MODEL")) {
            self.default_model = model;
        }
        if let Some(url) = var("AWS_API_BASE_URL") {
            self.tools.aws_api_url = Some(url);
        }
        if let Some(host) = var("CLOUDCLAW_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = var("CLOUDCLAW_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("CLOUDCLAW_PORT is not a port: {port}"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cloudclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be at least 1".into(),
            ));
        }
        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be > 0".into(),
            ));
        }
        if self.agent.tool_start_marker.trim().is_empty()
            || self.agent.tool_end_marker.trim().is_empty()
            || self.agent.tool_start_marker.trim() == self.agent.tool_end_marker.trim()
        {
            return Err(ConfigError::ValidationError(
                "tool markers must be non-empty and distinct".into(),
            ));
        }
        if self.gateway.max_message_chars == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.max_message_chars must be at least 1".into(),
            ));
        }
        if self.gateway.stream_buffer == 0 || self.gateway.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.stream_buffer and gateway.max_sessions must be > 0".into(),
            ));
        }
        if self.tools.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.request_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Settings for the active provider, if any were configured.
    pub fn provider_config(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.default_provider)
    }

    /// Model for the active provider: its own `default_model` when set,
    /// otherwise the top-level one.
    pub fn model(&self) -> &str {
        self.provider_config()
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: None,
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
