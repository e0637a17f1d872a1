use super::{http_status_error, map_send_error, LlmClient, LlmResponse};
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::json;

/// Anthropic's Messages API (spec.md §4.3).
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let url = "https://api.anthropic.com/v1/messages";

        let body = json!({
            "model": model,
            "max_tokens": 400,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let resp = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error("anthropic", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(http_status_error("anthropic", status, text));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| map_send_error("anthropic", e))?;
        let text = json
            .pointer("/content/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Fatal("anthropic API response missing content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "anthropic",
            model: model.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}
