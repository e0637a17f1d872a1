use super::{http_status_error, map_send_error, LlmClient, LlmResponse};
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::json;

/// OpenAI chat completions (spec.md §4.3). Mirrors `assay-core`'s own
/// `OpenAIClient` request shape, minus the VCR record/replay wrapper — this crate's
/// test doubles live behind [`super::fake::FakeClient`] instead.
pub struct OpenAIClient {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let url = "https://api.openai.com/v1/chat/completions";

        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": 400,
        });

        let resp = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error("openai", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(http_status_error("openai", status, text));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| map_send_error("openai", e))?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Fatal("openai API response missing content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openai",
            model: model.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
