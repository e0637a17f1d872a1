//! Runtime configuration loaded from environment variables (spec.md §6).
//!
//! Mirrors `assay-core`'s `config` module in shape: a plain struct with a
//! `from_env` constructor and `..Default::default()`-friendly fields, rather than a
//! derive-heavy `clap`/`figment` layer — this crate has no HTTP surface to gate
//! config parsing behind, so the original's `functools.lru_cache`d `Settings` object
//! becomes a cheap value type callers construct once at startup.

use std::env;

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file backing the store adapter (C2). Stands in
    /// for `SUPABASE_URL`/`SUPABASE_KEY` in the original.
    pub database_path: String,
    pub upload_batch_size: u32,
    pub run_judges_page: u32,
    pub job_batch_size: u32,
    pub evaluations_page_limit: u32,
    pub worker_concurrency: u32,
    pub worker_batch: u32,
    pub worker_poll_interval: f64,
    pub worker_judge_refresh: f64,
    pub max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "quorum.db".to_string()),
            upload_batch_size: env_u32("UPLOAD_BATCH_SIZE", 100),
            run_judges_page: env_u32("RUN_JUDGES_PAGE", 1000),
            job_batch_size: env_u32("JOB_BATCH_SIZE", 500),
            evaluations_page_limit: env_u32("EVALUATIONS_PAGE_LIMIT", 50),
            worker_concurrency: env_u32("WORKER_CONCURRENCY", 4),
            worker_batch: env_u32("WORKER_BATCH", 10),
            worker_poll_interval: env_f64("WORKER_POLL_INTERVAL", 5.0),
            worker_judge_refresh: env_f64("WORKER_JUDGE_REFRESH", 60.0),
            max_attempts: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "quorum.db".to_string(),
            upload_batch_size: 100,
            run_judges_page: 1000,
            job_batch_size: 500,
            evaluations_page_limit: 50,
            worker_concurrency: 4,
            worker_batch: 10,
            worker_poll_interval: 5.0,
            worker_judge_refresh: 60.0,
            max_attempts: 3,
        }
    }
}

/// Which provider API keys are present in the environment (§4.3, §6). The worker
/// loop builds its provider-clients map from this once per dispatch cycle.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub groq: Option<String>,
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
}

impl ProviderKeys {
    pub fn from_env() -> Self {
        Self {
            groq: env::var("GROQ_API_KEY").ok(),
            openai: env::var("OPENAI_API_KEY").ok(),
            anthropic: env::var("ANTHROPIC_API_KEY").ok(),
            gemini: env::var("GEMINI_API_KEY").ok(),
        }
    }
}
