//! LLM API client for the opponent decision collaborator.
//!
//! Both providers speak the chat-completions wire format; Ark additionally
//! accepts a `thinking` selector. Every call requests a JSON object body so
//! replies can be schema-validated downstream.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const ARK_ENDPOINT: &str = "https://ark.cn-beijing.volces.com/api/v3/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Volcengine Ark (Doubao models).
    Ark,
    /// OpenAI (GPT models).
    OpenAI,
}

impl LlmProvider {
    fn endpoint(self) -> &'static str {
        match self {
            LlmProvider::Ark => ARK_ENDPOINT,
            LlmProvider::OpenAI => OPENAI_ENDPOINT,
        }
    }
}

/// Reasoning-effort selector forwarded to providers that support it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThinkingMode {
    /// Always think before answering.
    Enabled,
    /// Answer directly.
    Disabled,
    /// Provider decides.
    Auto,
}

/// Configuration for the LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider, model = %model))]
    pub fn new(provider: LlmProvider, api_key: String, model: String, max_tokens: u32) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            api_key,
            model,
            max_tokens,
        }
    }

    /// Gets the provider.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Gets the model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Chat-completions client over the configured provider.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!("Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Sends one system-prompt completion request and returns the raw
    /// message content. The reply is requested as a JSON object but not
    /// parsed here; schema validation belongs to the caller.
    #[instrument(skip(self, system_prompt), fields(provider = ?self.config.provider, model = %self.config.model))]
    pub async fn generate(
        &self,
        system_prompt: &str,
        thinking: ThinkingMode,
    ) -> Result<String, LlmError> {
        debug!(prompt_length = system_prompt.len(), "Building chat completion request");

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt }
            ],
            "response_format": { "type": "json_object" }
        });
        if self.config.provider == LlmProvider::Ark {
            body["thinking"] = serde_json::json!({ "type": thinking.to_string() });
        }

        debug!(endpoint = self.config.provider.endpoint(), "Sending request");
        let response = self
            .http
            .post(self.config.provider.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Chat completion request failed");
                LlmError::new(format!("Chat completion request failed: {}", e))
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read response body");
            LlmError::new(format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            error!(status = %status, response = %response_text, "Chat completion API error");
            return Err(LlmError::new(format!(
                "Chat completion API error {}: {}",
                status, response_text
            )));
        }

        debug!(response_length = response_text.len(), "Parsing response envelope");
        let envelope: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(error = ?e, response = %response_text, "Failed to parse response envelope");
            LlmError::new(format!("Failed to parse response: {}", e))
        })?;

        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %envelope, "No message content in response");
                LlmError::new("No message content in response".to_string())
            })?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where the error was created.
    pub line: u32,
    /// Source file where the error was created.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
