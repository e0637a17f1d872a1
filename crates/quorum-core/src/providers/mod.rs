//! Provider registry (C3, spec.md §4.3).

pub mod llm;

use crate::config::ProviderKeys;
use llm::{anthropic::AnthropicClient, gemini::GeminiClient, groq::GroqClient, openai::OpenAIClient, LlmClient};
use std::collections::HashMap;
use std::sync::Arc;

/// Infers a provider id from a model name, applying spec.md §4.3's resolution
/// order: inferred-from-model wins over an explicit override when they disagree.
fn infer_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("gemini") {
        Some("gemini")
    } else if model.starts_with("gpt") || model.starts_with("o1") {
        Some("openai")
    } else if model.starts_with("claude") {
        Some("anthropic")
    } else if model.starts_with("llama") || model.starts_with("mixtral") {
        Some("groq")
    } else {
        None
    }
}

/// Resolves a judge's provider id from its `(provider_override, model)` pair
/// (spec.md §4.3). Returns `None` when no provider can be determined — the caller
/// (C5) treats that as an unroutable judge, not an error.
pub fn resolve_provider(provider_override: Option<&str>, model: &str) -> Option<String> {
    let inferred = infer_from_model(model);

    match (inferred, provider_override) {
        (Some(inferred), Some(_override)) => Some(inferred.to_string()),
        (None, Some(o)) => {
            let trimmed = o.trim().to_lowercase();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        (Some(inferred), None) => Some(inferred.to_string()),
        (None, None) => None,
    }
}

/// A map of provider-id → client, built fresh for each worker dispatch cycle from
/// whichever API keys are present in the environment (spec.md §4.8 step 3). A
/// provider is present only if its key is configured. Cheaply `Clone`: each
/// dispatched job gets its own handle to the same underlying clients.
#[derive(Clone)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn LlmClient>>,
}

impl ProviderRegistry {
    pub fn from_keys(keys: &ProviderKeys) -> Self {
        let mut clients: HashMap<String, Arc<dyn LlmClient>> = HashMap::new();
        if let Some(key) = &keys.groq {
            clients.insert("groq".to_string(), Arc::new(GroqClient::new(key.clone())));
        }
        if let Some(key) = &keys.openai {
            clients.insert("openai".to_string(), Arc::new(OpenAIClient::new(key.clone())));
        }
        if let Some(key) = &keys.anthropic {
            clients.insert(
                "anthropic".to_string(),
                Arc::new(AnthropicClient::new(key.clone())),
            );
        }
        if let Some(key) = &keys.gemini {
            clients.insert("gemini".to_string(), Arc::new(GeminiClient::new(key.clone())));
        }
        Self { clients }
    }

    /// Builds a registry from an explicit set of clients (tests, or CLI code paths
    /// wiring in a [`llm::fake::FakeClient`]).
    pub fn from_clients(clients: HashMap<String, Arc<dyn LlmClient>>) -> Self {
        Self { clients }
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmClient>> {
        self.clients.get(provider_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_provider_from_model_prefix() {
        assert_eq!(resolve_provider(None, "gpt-4o").as_deref(), Some("openai"));
        assert_eq!(resolve_provider(None, "o1-mini").as_deref(), Some("openai"));
        assert_eq!(
            resolve_provider(None, "claude-3-5-sonnet").as_deref(),
            Some("anthropic")
        );
        assert_eq!(resolve_provider(None, "gemini-1.5-pro").as_deref(), Some("gemini"));
        assert_eq!(resolve_provider(None, "llama-3.1-70b").as_deref(), Some("groq"));
        assert_eq!(resolve_provider(None, "mixtral-8x7b").as_deref(), Some("groq"));
    }

    #[test]
    fn unrecognized_model_with_no_override_is_unroutable() {
        assert_eq!(resolve_provider(None, "unknown-42"), None);
    }

    #[test]
    fn override_is_used_when_model_does_not_infer_anything() {
        assert_eq!(resolve_provider(Some("groq"), "unknown-42").as_deref(), Some("groq"));
    }

    #[test]
    fn inferred_value_wins_over_a_disagreeing_override() {
        // spec.md §8 boundary behavior, verbatim.
        assert_eq!(
            resolve_provider(Some("GROQ"), "gpt-4o").as_deref(),
            Some("openai")
        );
    }

    #[test]
    fn override_is_lowercased_and_trimmed() {
        assert_eq!(
            resolve_provider(Some("  OpenAI  "), "unknown-42").as_deref(),
            Some("openai")
        );
    }

    #[test]
    fn no_model_inference_and_no_override_is_null() {
        assert_eq!(resolve_provider(None, "unknown-42"), None);
        assert_eq!(resolve_provider(Some(""), "unknown-42"), None);
    }
}
