use super::{http_status_error, map_send_error, LlmClient, LlmResponse};
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::json;

/// Groq's OpenAI-compatible chat completions endpoint (spec.md §4.3).
pub struct GroqClient {
    api_key: String,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let url = "https://api.groq.com/openai/v1/chat/completions";

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
            .map_err(|e| map_send_error("groq", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(http_status_error("groq", status, text));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| map_send_error("groq", e))?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Fatal("groq API response missing content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "groq",
            model: model.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }
}
