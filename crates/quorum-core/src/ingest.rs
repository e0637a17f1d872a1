//! Submission ingester (C9, spec.md §4.9).

use crate::errors::IngestError;
use crate::fingerprint::{simhash, simhash_bucket};
use crate::model::{Submission, SubmissionData};
use crate::storage::Store;
use serde::{Deserialize, Serialize};

/// Wire shape of one incoming submission, prior to fingerprint derivation.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionInput {
    pub id: String,
    pub queue_id: String,
    pub labeling_task_id: String,
    pub created_at: i64,
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
    #[serde(default)]
    pub answers: std::collections::HashMap<String, crate::model::Answer>,
}

#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct IngestResult {
    pub uploaded: u64,
}

fn validate(input: &SubmissionInput) -> Result<(), IngestError> {
    if input.id.is_empty() {
        return Err(IngestError::MissingField {
            id: input.id.clone(),
            field: "id",
        });
    }
    if input.queue_id.is_empty() {
        return Err(IngestError::MissingField {
            id: input.id.clone(),
            field: "queue_id",
        });
    }
    if input.labeling_task_id.is_empty() {
        return Err(IngestError::MissingField {
            id: input.id.clone(),
            field: "labeling_task_id",
        });
    }
    Ok(())
}

/// Ingests a bulk submission payload (spec.md §4.9). Fingerprinting a submission's
/// answer text cannot itself fail in this implementation (no I/O, no external
/// dependency), so unlike the original's `try/except` around a C-extension hash
/// call, fingerprints are always present here; step-5's "store anyway on failure"
/// note has no observable effect in this port and is preserved structurally by
/// `Submission::answer_simhash`/`simhash_bucket` remaining `Option` fields.
pub fn ingest_submissions(
    store: &Store,
    inputs: Vec<SubmissionInput>,
    upload_batch_size: u32,
) -> Result<IngestResult, IngestError> {
    if inputs.is_empty() {
        return Err(IngestError::EmptyBatch);
    }

    let mut submissions = Vec::with_capacity(inputs.len());
    for input in &inputs {
        validate(input)?;

        let data = SubmissionData {
            questions: input.questions.clone(),
            answers: input.answers.clone(),
        };

        let fingerprint = simhash(&data.full_answer_text());

        submissions.push(Submission {
            id: input.id.clone(),
            queue_id: input.queue_id.clone(),
            labeling_task_id: input.labeling_task_id.clone(),
            created_at: input.created_at,
            data,
            answer_simhash: Some(fingerprint),
            simhash_bucket: Some(simhash_bucket(fingerprint)),
        });
    }

    let mut uploaded = 0u64;
    for chunk in submissions.chunks(upload_batch_size.max(1) as usize) {
        upsert_chunk(store, chunk)?;
        uploaded += chunk.len() as u64;
    }

    Ok(IngestResult { uploaded })
}

fn upsert_chunk(store: &Store, chunk: &[Submission]) -> Result<(), IngestError> {
    Ok(store.upsert_submissions(chunk)?)
}
