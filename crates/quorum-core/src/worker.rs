//! Worker loop (C8, spec.md §4.8).
//!
//! Bounded-concurrency dispatch grounded on `assay-core::engine::runner::Runner::run_suite`'s
//! `Semaphore` + `JoinSet` shape, adapted from "run every test case in a suite" to
//! "drain a batch of claimed jobs".

use crate::config::{Config, ProviderKeys};
use crate::errors::{should_retry, ProviderError};
use crate::judge::run_single_judge;
use crate::model::{Job, Judge};
use crate::providers::ProviderRegistry;
use crate::storage::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, warn};

/// Local retry cap for a single job's provider call within one dispatch attempt
/// (spec.md §4.8 step 5: "capped at 10 tries per in-memory invocation").
const MAX_LOCAL_TRIES: u32 = 10;

fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 100u64.saturating_mul(1u64 << attempt.min(10));
    let capped = base_ms.min(5_000);
    let jitter = rand::random::<u64>() % 100;
    Duration::from_millis(capped + jitter)
}

/// Classifies an error surfaced from `run_single_judge` as retryable (spec.md §7).
/// Provider clients raise a typed [`ProviderError`] (see `providers/llm`), so the
/// common case matches on structure; [`should_retry`]'s substring heuristic is the
/// fallback for errors that cross some other boundary (store RPC, a test double's
/// plain string) without that structure.
fn is_retryable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<ProviderError>() {
        Some(provider_err) => provider_err.is_retryable(),
        None => should_retry(&err.to_string()),
    }
}

/// Retries `run_single_judge` in-process while the error classifies as transient,
/// up to [`MAX_LOCAL_TRIES`]. A non-retryable error (or exhaustion) returns the last
/// error to the caller, which persists it via C7/`record_job_failure`.
async fn run_with_retry(
    job: &Job,
    provider_registry: &ProviderRegistry,
    judges_catalog: &HashMap<String, Judge>,
) -> anyhow::Result<Option<crate::model::Evaluation>> {
    let mut last_err = None;
    for attempt in 0..MAX_LOCAL_TRIES {
        match run_single_judge(
            &job.submission_id,
            &job.submission_data,
            &job.question_id,
            &job.judge_id,
            &job.queue_id,
            provider_registry,
            judges_catalog,
        )
        .await
        {
            Ok(result) => return Ok(result),
            Err(e) => {
                let retryable = is_retryable(&e);
                let exhausted = attempt + 1 == MAX_LOCAL_TRIES;
                last_err = Some(e);
                if !retryable || exhausted {
                    break;
                }
                sleep(backoff_delay(attempt)).await;
            }
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}

/// Dispatches one claimed job to completion: run, write, transition (spec.md §4.8
/// step 4-5). Store errors while persisting results are logged, not propagated —
/// the job's own status transition is the authoritative outcome.
async fn dispatch_job(
    store: &Store,
    judges_catalog: &HashMap<String, Judge>,
    provider_registry: &ProviderRegistry,
    job: Job,
    max_attempts: u32,
) {
    match run_with_retry(&job, provider_registry, judges_catalog).await {
        Ok(Some(eval)) => {
            if let Err(e) = store.upsert_evaluation(&eval) {
                warn!(job_id = %job.id, error = %e, "failed to persist evaluation");
            }
            if let Err(e) = store.mark_job_done(&job.id) {
                warn!(job_id = %job.id, error = %e, "failed to mark job done");
            }
        }
        Ok(None) => {
            // C5 precondition failed (unroutable judge, missing question, ...): a
            // no-op, not a failure (spec.md §4.5).
            if let Err(e) = store.mark_job_done(&job.id) {
                warn!(job_id = %job.id, error = %e, "failed to mark no-op job done");
            }
        }
        Err(err) => {
            let attempts = job.attempts + 1;
            if let Err(e) = store.record_job_failure(&job.id, attempts, max_attempts, &err.to_string()) {
                error!(job_id = %job.id, error = %e, "failed to record job failure");
            }
        }
    }
}

/// Claims and dispatches a single batch (one pass of spec.md §4.8 steps 2-4).
/// Exposed separately from [`run`] so tests can drive one cycle deterministically
/// with a fake provider registry instead of environment-derived API keys.
pub async fn dispatch_batch(
    store: &Store,
    judges_catalog: &HashMap<String, Judge>,
    provider_registry: &ProviderRegistry,
    batch_size: u32,
    concurrency: u32,
    max_attempts: u32,
) -> Result<usize, crate::errors::StoreError> {
    let claimed = store.claim_pending(batch_size)?;
    let dispatched = claimed.len();
    if claimed.is_empty() {
        return Ok(0);
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1) as usize));
    let mut set = JoinSet::new();
    for job in claimed {
        let store = store.clone();
        let catalog = judges_catalog.clone();
        let registry = provider_registry.clone();
        let sem = semaphore.clone();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore never closed");
            dispatch_job(&store, &catalog, &registry, job, max_attempts).await;
        });
    }
    while set.join_next().await.is_some() {}

    Ok(dispatched)
}

/// Runs the worker loop forever (spec.md §4.8): refreshes the judges catalog on
/// `WORKER_JUDGE_REFRESH`, claims and dispatches batches, and sleeps `POLL_INTERVAL`
/// whenever nothing is pending. Loop-level errors are logged and do not terminate
/// the loop (step 6).
pub async fn run(store: Store, config: Config) -> ! {
    let mut judges_catalog: HashMap<String, Judge> = HashMap::new();
    let refresh_interval = Duration::from_secs_f64(config.worker_judge_refresh.max(0.0));
    let mut last_refresh = Instant::now() - refresh_interval - Duration::from_secs(1);

    loop {
        if last_refresh.elapsed() >= refresh_interval {
            match store.list_judges() {
                Ok(catalog) => {
                    judges_catalog = catalog;
                    last_refresh = Instant::now();
                }
                Err(e) => {
                    error!(error = %e, "failed to refresh judges catalog");
                }
            }
        }

        let provider_registry = ProviderRegistry::from_keys(&ProviderKeys::from_env());

        let outcome = dispatch_batch(
            &store,
            &judges_catalog,
            &provider_registry,
            config.worker_batch,
            config.worker_concurrency,
            config.max_attempts,
        )
        .await;

        match outcome {
            Ok(0) => sleep(Duration::from_secs_f64(config.worker_poll_interval)).await,
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "worker loop error, continuing");
                sleep(Duration::from_secs_f64(config.worker_poll_interval)).await;
            }
        }
    }
}
