//! Judge runner (C5, spec.md §4.5).

use crate::fingerprint::simhash;
use crate::model::{Evaluation, Judge, SubmissionData};
use crate::providers::{resolve_provider, ProviderRegistry};
use crate::verdict;
use std::collections::HashMap;

const PROMPT_TEMPLATE: &str =
    "{system_prompt}\n\nQuestion: {question_text}\n\nAnswer: {answer_text}\n\nResponse ONLY with a Json object: {\"verdict\":\"pass|fail|inconclusive\",\"reasoning\":\"...\"}\n";

fn format_prompt(system_prompt: &str, question_text: &str, answer_text: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{system_prompt}", system_prompt)
        .replace("{question_text}", question_text)
        .replace("{answer_text}", answer_text)
}

/// Dispatches a single (submission, question, judge) tuple to its resolved
/// provider and returns the resulting evaluation, or `None` when any precondition
/// in spec.md §4.5 steps 1-5 fails to hold (a no-op, not an error).
///
/// `queue_id` is carried through from the job that requested this run rather than
/// being a judge-runner concern; it only matters to the writer (C7).
pub async fn run_single_judge(
    submission_id: &str,
    submission_data: &SubmissionData,
    question_id: &str,
    judge_id: &str,
    queue_id: &str,
    provider_clients: &ProviderRegistry,
    judges_catalog: &HashMap<String, Judge>,
) -> anyhow::Result<Option<Evaluation>> {
    let Some(question) = submission_data.find_question(question_id) else {
        return Ok(None);
    };

    let Some(answer) = submission_data.answers.get(question_id) else {
        return Ok(None);
    };

    let Some(judge) = judges_catalog.get(judge_id) else {
        return Ok(None);
    };
    if !judge.active {
        return Ok(None);
    }

    let answer_text = answer.answer_text();

    let Some(provider_id) = resolve_provider(judge.provider.as_deref(), &judge.model) else {
        return Ok(None);
    };
    let Some(client) = provider_clients.get(&provider_id) else {
        return Ok(None);
    };
    if judge.model.is_empty() {
        return Ok(None);
    }

    let question_text = question.display_text();
    let prompt = format_prompt(&judge.system_prompt, &question_text, &answer_text);

    let response = client.complete(&judge.model, &prompt).await?;

    let (verdict, reasoning) = verdict::parse(&response.text);
    let reasoning = verdict::truncate(&reasoning, 1000);
    let reasoning_simhash = simhash(&reasoning);

    Ok(Some(Evaluation {
        submission_id: submission_id.to_string(),
        question_id: question_id.to_string(),
        judge_id: judge_id.to_string(),
        queue_id: queue_id.to_string(),
        verdict,
        reasoning,
        reasoning_simhash,
        created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        updated_at: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::FakeClient;
    use std::sync::Arc;

    fn submission_data_with(question_id: &str, answer_text: &str) -> SubmissionData {
        let mut answers = HashMap::new();
        answers.insert(
            question_id.to_string(),
            crate::model::Answer::Scalar(serde_json::json!(answer_text)),
        );
        SubmissionData {
            questions: vec![serde_json::json!({"id": question_id, "questionText": "Is this correct?"})],
            answers,
        }
    }

    fn judge(model: &str) -> Judge {
        Judge {
            id: "j1".to_string(),
            name: "Accuracy".to_string(),
            system_prompt: "You are a strict grader.".to_string(),
            model: model.to_string(),
            active: true,
            provider: None,
        }
    }

    fn registry_with_fake(provider: &str, text: &str) -> ProviderRegistry {
        let mut clients: HashMap<String, Arc<dyn crate::providers::llm::LlmClient>> = HashMap::new();
        clients.insert(
            provider.to_string(),
            Arc::new(FakeClient::fixed("fake", text)),
        );
        ProviderRegistry::from_clients(clients)
    }

    #[tokio::test]
    async fn happy_path_produces_an_evaluation() {
        let data = submission_data_with("qa", "42");
        let mut catalog = HashMap::new();
        catalog.insert("j1".to_string(), judge("llama-3.1-70b"));
        let registry = registry_with_fake("groq", r#"{"verdict":"pass","reasoning":"correct"}"#);

        let eval = run_single_judge("s1", &data, "qa", "j1", "q1", &registry, &catalog)
            .await
            .unwrap()
            .expect("expected an evaluation");

        assert_eq!(eval.verdict, crate::model::Verdict::Pass);
        assert_eq!(eval.reasoning, "correct");
        assert_eq!(eval.queue_id, "q1");
    }

    #[tokio::test]
    async fn missing_question_is_a_no_op() {
        let data = submission_data_with("qa", "42");
        let mut catalog = HashMap::new();
        catalog.insert("j1".to_string(), judge("llama-3.1-70b"));
        let registry = registry_with_fake("groq", r#"{"verdict":"pass"}"#);

        let result = run_single_judge("s1", &data, "missing", "j1", "q1", &registry, &catalog)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn inactive_judge_is_a_no_op() {
        let data = submission_data_with("qa", "42");
        let mut inactive = judge("llama-3.1-70b");
        inactive.active = false;
        let mut catalog = HashMap::new();
        catalog.insert("j1".to_string(), inactive);
        let registry = registry_with_fake("groq", r#"{"verdict":"pass"}"#);

        let result = run_single_judge("s1", &data, "qa", "j1", "q1", &registry, &catalog)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unroutable_judge_is_a_no_op() {
        let data = submission_data_with("qa", "42");
        let mut catalog = HashMap::new();
        catalog.insert("j1".to_string(), judge("unknown-model-xyz"));
        let registry = registry_with_fake("groq", r#"{"verdict":"pass"}"#);

        let result = run_single_judge("s1", &data, "qa", "j1", "q1", &registry, &catalog)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn provider_failure_propagates_as_an_error() {
        let data = submission_data_with("qa", "42");
        let mut catalog = HashMap::new();
        catalog.insert("j1".to_string(), judge("llama-3.1-70b"));

        let mut clients: HashMap<String, Arc<dyn crate::providers::llm::LlmClient>> = HashMap::new();
        clients.insert(
            "groq".to_string(),
            Arc::new(FakeClient::sequence("fake", vec![Err("rate limited, retry after 1s".to_string())])),
        );
        let registry = ProviderRegistry::from_clients(clients);

        let result = run_single_judge("s1", &data, "qa", "j1", "q1", &registry, &catalog).await;
        assert!(result.is_err());
    }
}
