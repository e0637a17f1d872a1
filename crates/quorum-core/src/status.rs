//! Status reporter (C10, spec.md §4.10).

use crate::errors::StoreError;
use crate::model::JobCounts;
use crate::storage::Store;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusPayload {
    pub counts: JobCounts,
    pub total: u64,
}

pub fn job_status(store: &Store, queue_id: &str) -> Result<StatusPayload, StoreError> {
    let counts = store.job_counts(queue_id)?;
    Ok(StatusPayload {
        total: counts.total(),
        counts,
    })
}

/// Live variant of [`job_status`]: emits the same payload once per second until the
/// queue has drained (`pending + running == 0` with at least one job total), then
/// closes the channel. Dropping the receiver cleanly stops the producer task on its
/// next tick (spec.md §4.10, §5 "Cancellation & timeouts").
pub fn watch_job_status(store: Store, queue_id: String) -> mpsc::Receiver<Result<StatusPayload, StoreError>> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let payload = job_status(&store, &queue_id);
            let should_stop = matches!(&payload, Ok(p) if p.total > 0 && p.counts.pending + p.counts.running == 0);
            if tx.send(payload).await.is_err() {
                // Consumer dropped the receiver; stop producing.
                return;
            }
            if should_stop {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Job, JobStatus, SubmissionData};

    fn store_with_one_job(queue_id: &str) -> Store {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        store
            .insert_jobs(&[Job {
                id: "job-1".to_string(),
                submission_id: "s1".to_string(),
                submission_data: SubmissionData::default(),
                question_id: "qa".to_string(),
                judge_id: "j1".to_string(),
                queue_id: queue_id.to_string(),
                status: JobStatus::Pending,
                attempts: 0,
                last_error: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: None,
            }])
            .unwrap();
        store
    }

    #[test]
    fn reports_counts_and_total() {
        let store = store_with_one_job("q1");
        let status = job_status(&store, "q1").unwrap();
        assert_eq!(status.total, 1);
        assert_eq!(status.counts.pending, 1);
    }

    #[test]
    fn empty_queue_reports_zero_total() {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let status = job_status(&store, "q1").unwrap();
        assert_eq!(status.total, 0);
    }

    #[tokio::test]
    async fn watch_stream_closes_once_queue_drains() {
        let store = store_with_one_job("q1");
        store.mark_job_done("job-1").unwrap();

        let mut rx = watch_job_status(store, "q1".to_string());
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.counts.done, 1);
        assert_eq!(first.counts.pending + first.counts.running, 0);

        // The producer stops after emitting a fully-drained payload.
        assert!(rx.recv().await.is_none());
    }
}
