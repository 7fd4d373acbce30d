//! Configuration loading, validation, and management for NoteChat.
//!
//! Loads configuration from `~/.notechat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.notechat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_tokens: Option<u32>,

    /// System prompt sent ahead of every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Context budgeting
    #[serde(default)]
    pub budget: BudgetConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_system_prompt() -> String {
    "You are a helpful assistant embedded in a note-taking app. \
     Answer using the provided notes when they are relevant."
        .into()
}

/// Redact a secret for Debug output.
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
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_response_tokens", &self.max_response_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("budget", &self.budget)
            .finish()
    }
}

/// How the model's context window is split between notes and history.
///
/// Whatever `article_ratio + conversation_ratio` leaves over is the reserve
/// for the system prompt and the new user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Token ceiling for one assembled request
    #[serde(default = "default_total_tokens")]
    pub total_tokens: usize,

    /// Share of `total_tokens` given to note/document content
    #[serde(default = "default_article_ratio")]
    pub article_ratio: f64,

    /// Share of `total_tokens` given to prior conversation turns
    #[serde(default = "default_conversation_ratio")]
    pub conversation_ratio: f64,

    /// Paragraph-aligned chunk size (characters) for long documents
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

fn default_total_tokens() -> usize {
    16_000
}
fn default_article_ratio() -> f64 {
    0.65
}
fn default_conversation_ratio() -> f64 {
    0.25
}
fn default_max_chunk_size() -> usize {
    2000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_tokens: default_total_tokens(),
            article_ratio: default_article_ratio(),
            conversation_ratio: default_conversation_ratio(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path with env var overrides.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let config = Self::load_from(&config_path)?;
        config.with_env_overrides(|key| std::env::var(key).ok())
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

    /// Apply `NOTECHAT_*` overrides read through `lookup`, then re-validate.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("NOTECHAT_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }

        if let Some(model) = lookup("NOTECHAT_MODEL").filter(|m| !m.is_empty()) {
            self.model = model;
        }

        if let Some(raw) = lookup("NOTECHAT_TOTAL_TOKENS") {
            self.budget.total_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "NOTECHAT_TOTAL_TOKENS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".notechat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let budget = &self.budget;
        if budget.total_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "budget.total_tokens must be > 0".into(),
            ));
        }

        for (name, ratio) in [
            ("budget.article_ratio", budget.article_ratio),
            ("budget.conversation_ratio", budget.conversation_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be in (0.0, 1.0]"
                )));
            }
        }

        if budget.article_ratio + budget.conversation_ratio > 1.0 {
            return Err(ConfigError::ValidationError(
                "budget.article_ratio + budget.conversation_ratio must be <= 1.0".into(),
            ));
        }

        if budget.max_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "budget.max_chunk_size must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_response_tokens: None,
            system_prompt: default_system_prompt(),
            budget: BudgetConfig::default(),
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
