// OpenAI chat-completions adapter
// Works against any OpenAI-compatible endpoint; the base URL comes from configuration.
// API Reference: https://platform.openai.com/docs/api-reference/chat/create

use crate::config::DEFAULT_OPENAI_API_BASE;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::new_with_api_base(api_key, DEFAULT_OPENAI_API_BASE)
    }

    pub fn new_with_api_base(api_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Adapter whose requests give up after `timeout`.
    pub fn with_timeout(api_key: &str, api_base: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let body = OpenAIChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMApi(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                return Err(AppError::LLMApi(format!(
                    "OpenAI API error ({}): {} (type: {})",
                    status,
                    error_response.error.message,
                    error_response.error.error_type.as_deref().unwrap_or("unknown")
                )));
            }

            return Err(AppError::LLMApi(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMApi(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMApi("OpenAI returned no choices".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| AppError::LLMApi("OpenAI returned a message without content".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> LLMRequest {
        LLMRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![
                LLMMessage::system("You are helpful."),
                LLMMessage::user("What is on page 2?"),
            ],
            max_tokens: Some(500),
            temperature: Some(0.7),
        }
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": "You are helpful."},
                    {"role": "user", "content": "What is on page 2?"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-1",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "It is on page 2."},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let response = adapter.create_chat_completion(&request()).await.unwrap();

        assert_eq!(response.content, "It is on page 2.");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 18);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"error": {"message": "You exceeded your current quota", "type": "insufficient_quota"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let err = adapter.create_chat_completion(&request()).await.unwrap_err();

        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("You exceeded your current quota"));
    }

    #[tokio::test]
    async fn test_null_content_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "stop"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        assert!(matches!(
            adapter.create_chat_completion(&request()).await,
            Err(AppError::LLMApi(_))
        ));
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let adapter = OpenAIAdapter::new_with_api_base("k", "http://localhost:1234/v1/");
        assert_eq!(adapter.completions_url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(
            OpenAIAdapter::new("k").completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
