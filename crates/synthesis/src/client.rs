//! LLM endpoint client. One single-turn completion per report, bounded
//! output tokens, explicit timeout, no retries.

use async_trait::async_trait;
use insight_core::config::LlmConfig;
use insight_core::{InsightError, InsightResult};
use serde::{Deserialize, Serialize};

/// Abstraction over the completion endpoint so the synthesizer can be tested
/// without a network.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one user prompt and return the raw text reply.
    async fn complete(&self, prompt: &str) -> InsightResult<String>;
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic-style messages API client. Constructed once at startup and
/// injected into the synthesizer; construction fails fast when no API key is
/// configured.
pub struct AnthropicClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> InsightResult<Self> {
        if config.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(InsightError::Config(
                "LLM API key is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| InsightError::Synthesis(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        let body = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let url = format!("{}/messages", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.as_deref().unwrap_or(""))
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| InsightError::Synthesis(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(InsightError::Synthesis(format!(
                "LLM endpoint returned {}",
                response.status()
            )));
        }

        let response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InsightError::Synthesis(format!("LLM response invalid: {e}")))?;

        response
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| InsightError::Synthesis("no text block in LLM response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_fails_fast_without_api_key() {
        assert!(AnthropicClient::new(LlmConfig::default()).is_err());

        let empty_key = LlmConfig {
            api_key: Some(String::new()),
            ..LlmConfig::default()
        };
        assert!(AnthropicClient::new(empty_key).is_err());
    }

    #[test]
    fn test_construction_succeeds_with_key() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        assert!(AnthropicClient::new(config).is_ok());
    }
}
