//! Groq chat-completion client
//!
//! Groq exposes an OpenAI-compatible API; one POST per request, fixed model,
//! temperature, and token cap from configuration. Failures surface as
//! [`CoreError::Upstream`] and are never retried in the request path.

use async_trait::async_trait;
use cv_core::{CoreError, LlmClient, LlmConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fallback text when the provider returns an empty choice list or content.
const EMPTY_RESPONSE_FALLBACK: &str =
    "I apologize, but I couldn't generate a response at this time.";

/// Groq API client
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl GroqClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(CoreError::Config("Groq API key required".to_string()));
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| CoreError::Config(format!("HTTP client build failed: {e}")))?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Set a custom base URL (for compatible APIs or test stubs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_message.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoreError::Upstream(format!(
                "Groq returned HTTP {status}: {error_text}"
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Upstream(format!("Failed to parse response: {e}")))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string());

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_api_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            GroqClient::from_config(&config),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = ChatCompletionRequest {
            model: "llama3-8b-8192".to_string(),
            messages: vec![Message {
                role: "system".to_string(),
                content: "prompt".to_string(),
            }],
            max_tokens: 1000,
            temperature: 0.7,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-8b-8192");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_parse() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.choices[0].message.content, "hi");
    }
}
