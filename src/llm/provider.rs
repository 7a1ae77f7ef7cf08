use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::LLMConfig;
use crate::llm::openai::OpenAIAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Build the chat-completion adapter described by the configuration.
///
/// Returns `Ok(None)` when no API key is configured; callers answer in
/// degraded mode instead of failing.
pub fn adapter_from_config(config: &LLMConfig) -> AppResult<Option<Arc<dyn LLMAdapter>>> {
    let Some(api_key) = config.active_api_key() else {
        return Ok(None);
    };

    let adapter = OpenAIAdapter::with_timeout(
        &api_key,
        &config.api_base,
        Duration::from_secs(config.timeout_secs),
    )?;
    info!(api_base = %config.api_base, model = %config.model, "OpenAI adapter configured");

    Ok(Some(Arc::new(adapter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(key: Option<&str>) -> LLMConfig {
        LLMConfig {
            openai_api_key: key.map(str::to_string),
            api_base: "http://127.0.0.1:9".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_no_key_means_no_adapter() {
        assert!(adapter_from_config(&llm_config(None)).unwrap().is_none());
        assert!(adapter_from_config(&llm_config(Some(""))).unwrap().is_none());
    }

    #[test]
    fn test_key_builds_adapter() {
        assert!(adapter_from_config(&llm_config(Some("sk-test"))).unwrap().is_some());
    }
}
