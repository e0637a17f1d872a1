use super::{LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::Mutex;

/// Test double for [`LlmClient`] (grounded on `verdict-core`'s `FakeClient` and
/// `assay-core`'s judge-test `MockLlmClient`): replays a fixed queue of
/// `Ok(text)`/`Err(message)` results, one per call, in order. Used by
/// `quorum-core`'s worker/judge tests so they never touch the network (spec.md §1
/// "Non-goals" + SPEC_FULL.md §1 test tooling).
pub struct FakeClient {
    name: &'static str,
    queue: Mutex<Vec<Result<String, String>>>,
}

impl FakeClient {
    /// A client that always returns the same text.
    pub fn fixed(name: &'static str, text: impl Into<String>) -> Self {
        Self {
            name,
            queue: Mutex::new(vec![Ok(text.into())]),
        }
    }

    /// A client that replays `results` in order, one per `complete()` call.
    pub fn sequence(name: &'static str, results: Vec<Result<String, String>>) -> Self {
        Self {
            name,
            queue: Mutex::new(results),
        }
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, model: &str, _prompt: &str) -> anyhow::Result<LlmResponse> {
        let mut queue = self.queue.lock().unwrap();
        if queue.is_empty() {
            anyhow::bail!("FakeClient({}): no more queued responses", self.name);
        }
        let next = if queue.len() == 1 {
            queue[0].clone()
        } else {
            queue.remove(0)
        };
        match next {
            Ok(text) => Ok(LlmResponse {
                text,
                provider: self.name,
                model: model.to_string(),
            }),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}
