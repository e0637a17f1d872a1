use super::{http_status_error, map_send_error, LlmClient, LlmResponse};
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::json;

/// Google's Gemini `generateContent` API (spec.md §4.3).
pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": 400 },
        });

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error("gemini", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(http_status_error("gemini", status, text));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| map_send_error("gemini", e))?;
        let text = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::Fatal("gemini API response missing content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "gemini",
            model: model.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
