//! Data model (spec.md §3).
//!
//! The untyped blob inside `Submission::data` is modeled as [`SubmissionData`] for
//! in-memory use, but persisted as an opaque JSON string, per §9's design note:
//! readers must accept both `{id, ...}` and `{data: {id, ...}}` question shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Inconclusive => "inconclusive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(Verdict::Pass),
            "fail" => Some(Verdict::Fail),
            "inconclusive" => Some(Verdict::Inconclusive),
            _ => None,
        }
    }
}

/// An embedded question entry inside `data.questions`. Accepts any of the three
/// question-text keys the original FastAPI models tolerated, plus the `{data: {...}}`
/// wrapping shape noted in spec.md §9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "questionText", skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(rename = "question_text", skip_serializing_if = "Option::is_none")]
    pub question_text_snake: Option<String>,
}

impl Question {
    /// First non-empty of `questionText`, `question_text`, `text`, falling back to a
    /// debug-rendering of the question object (spec.md §4.5 step 6).
    pub fn display_text(&self) -> String {
        self.question_text
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.question_text_snake.as_deref().filter(|s| !s.is_empty()))
            .or(self.text.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", self))
    }
}

/// An answer value: either a bare scalar, or an object carrying at least `choice` and
/// `reasoning` (spec.md §3). Stored as a raw JSON value so unknown keys survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    // `Object` must be tried before `Scalar`: untagged resolution picks the first
    // variant that deserializes, and `serde_json::Value` accepts any JSON input, so
    // listing `Scalar` first would swallow every object-shaped answer.
    Object(serde_json::Map<String, serde_json::Value>),
    Scalar(serde_json::Value),
}

impl Answer {
    /// Space-joined concatenation of the answer's values (spec.md §3, §4.9).
    pub fn answer_text(&self) -> String {
        match self {
            Answer::Object(map) => map
                .values()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(" "),
            Answer::Scalar(v) => scalar_to_string(v),
        }
    }
}

fn scalar_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubmissionData {
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
    #[serde(default)]
    pub answers: HashMap<String, Answer>,
}

impl SubmissionData {
    /// Locates a question by id, accepting both the top-level `{id, ...}` shape and
    /// the nested `{data: {id, ...}}` shape (spec.md §4.5 step 1, §9).
    pub fn find_question(&self, question_id: &str) -> Option<Question> {
        for raw in &self.questions {
            let qdata = raw.get("data").unwrap_or(raw);
            let Some(id) = qdata.get("id").and_then(|v| v.as_str()) else {
                continue;
            };
            if id == question_id {
                return serde_json::from_value(qdata.clone()).ok();
            }
        }
        None
    }

    /// True iff this submission carries the given question id, either as an answer
    /// key or as a question entry (spec.md §4.6 step 3).
    pub fn contains_question(&self, question_id: &str) -> bool {
        if self.answers.contains_key(question_id) {
            return true;
        }
        self.questions.iter().any(|raw| {
            let qdata = raw.get("data").unwrap_or(raw);
            qdata.get("id").and_then(|v| v.as_str()) == Some(question_id)
        })
    }

    /// Full answer text across every answer in the submission (spec.md §4.9 step 2).
    pub fn full_answer_text(&self) -> String {
        self.answers
            .values()
            .map(Answer::answer_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub queue_id: String,
    pub labeling_task_id: String,
    pub created_at: i64,
    pub data: SubmissionData,
    pub answer_simhash: Option<i64>,
    pub simhash_bucket: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judge {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub model: String,
    pub active: bool,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub queue_id: String,
    pub question_id: String,
    pub judge_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub submission_id: String,
    pub submission_data: SubmissionData,
    pub question_id: String,
    pub judge_id: String,
    pub queue_id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub submission_id: String,
    pub question_id: String,
    pub judge_id: String,
    pub queue_id: String,
    pub verdict: Verdict,
    pub reasoning: String,
    pub reasoning_simhash: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Counts returned by C10 (spec.md §4.10).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobCounts {
    pub pending: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
}

impl JobCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.running + self.done + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_shaped_answer_deserialized_from_json_joins_its_values() {
        // spec.md §8 scenario 1's own shape: {"choice": "A", "reasoning": "because"}.
        // Untagged enum resolution must try `Object` before `Scalar`, since
        // `serde_json::Value` accepts any input and would otherwise swallow this.
        let answer: Answer = serde_json::from_str(r#"{"choice":"A","reasoning":"because"}"#).unwrap();
        assert!(matches!(answer, Answer::Object(_)));
        assert_eq!(answer.answer_text(), "A because");
    }

    #[test]
    fn scalar_answer_deserialized_from_json_round_trips_its_string() {
        let answer: Answer = serde_json::from_str(r#""42""#).unwrap();
        assert!(matches!(answer, Answer::Scalar(_)));
        assert_eq!(answer.answer_text(), "42");
    }

    #[test]
    fn find_question_skips_malformed_entries_and_keeps_scanning() {
        let data = SubmissionData {
            questions: vec![
                serde_json::json!({"no_id_here": true}),
                serde_json::json!({"id": "qa", "questionText": "Is this correct?"}),
            ],
            answers: HashMap::new(),
        };
        let found = data.find_question("qa").expect("later valid entry must still be found");
        assert_eq!(found.id, "qa");
    }
}
