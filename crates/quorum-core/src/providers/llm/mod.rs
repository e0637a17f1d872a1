pub mod anthropic;
pub mod fake;
pub mod gemini;
pub mod groq;
pub mod openai;

use crate::errors::ProviderError;
use async_trait::async_trait;

/// Raw result of a single provider call, prior to verdict parsing (C4).
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub provider: &'static str,
    pub model: String,
}

/// A provider-specific `(client, model, prompt) → text` behavior (spec.md §4.3,
/// §9's "small registry, no reflection needed" note). One method, implemented once
/// per provider, matching `assay-core::providers::llm::LlmClient`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<LlmResponse>;

    fn provider_name(&self) -> &'static str;
}

/// Classifies a `reqwest` transport failure into a typed [`ProviderError`] (spec.md
/// §7: `ProviderTransient` on timeout, `ProviderFatal` otherwise) so the worker loop
/// (`run_with_retry`) can match on structure instead of the error's `Display` text.
pub(crate) fn map_send_error(provider: &'static str, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        ProviderError::Timeout(format!("{provider}: {err}")).into()
    } else {
        ProviderError::Fatal(format!("{provider}: {err}")).into()
    }
}

/// Classifies a non-2xx HTTP response from a provider (spec.md §7): a 429 is
/// `ProviderTransient`, anything else is `ProviderFatal`.
pub(crate) fn http_status_error(provider: &'static str, status: reqwest::StatusCode, body: String) -> anyhow::Error {
    if status.as_u16() == 429 {
        ProviderError::RateLimited(format!("{provider} API error (status {status}): {body}")).into()
    } else {
        ProviderError::Fatal(format!("{provider} API error (status {status}): {body}")).into()
    }
}
