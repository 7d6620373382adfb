//! Game configuration: board size, model selection, credentials.

use crate::grid::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::llm_client::{LlmConfig, LlmProvider, ThinkingMode};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration for one game session. Changes are only honored while the
/// match is in setup; credentials come from the environment, never the
/// config file.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board edge, 3..=10.
    #[serde(default = "default_board_size")]
    board_size: u8,

    /// LLM provider (ark or openai).
    #[serde(default = "default_provider")]
    provider: LlmProvider,

    /// Model identifier sent with every decision request.
    #[serde(default = "default_model")]
    model: String,

    /// Maximum tokens for decision replies.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Reasoning-effort selector forwarded to the provider.
    #[serde(default = "default_thinking_mode")]
    thinking_mode: ThinkingMode,
}

fn default_board_size() -> u8 {
    5
}

fn default_provider() -> LlmProvider {
    LlmProvider::Ark
}

fn default_model() -> String {
    "doubao-seed-1-6-250615".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_thinking_mode() -> ThinkingMode {
    ThinkingMode::Disabled
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        info!(board_size = config.board_size, model = %config.model, "Config loaded");
        Ok(config)
    }

    /// Overrides the board size, keeping the range check.
    pub fn with_board_size(mut self, size: u8) -> Result<Self, ConfigError> {
        self.board_size = size;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ConfigError::new(format!(
                "Board size {} outside {}..={}",
                self.board_size, MIN_BOARD_SIZE, MAX_BOARD_SIZE
            )));
        }
        Ok(())
    }

    /// Creates the LLM configuration, pulling the credential from
    /// `ARK_API_KEY` or `OPENAI_API_KEY`. Starting a game without the
    /// credential is blocked here, before the match leaves setup.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");

        let api_key = match self.provider {
            LlmProvider::Ark => std::env::var("ARK_API_KEY").map_err(|_| {
                ConfigError::new("ARK_API_KEY environment variable not set".to_string())
            })?,
            LlmProvider::OpenAI => std::env::var("OPENAI_API_KEY").map_err(|_| {
                ConfigError::new("OPENAI_API_KEY environment variable not set".to_string())
            })?,
        };

        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.model.clone(),
            self.max_tokens,
        ))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: default_board_size(),
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            thinking_mode: default_thinking_mode(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
