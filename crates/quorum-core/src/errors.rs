use thiserror::Error;

/// Failures from the store adapter (C2). Propagated to callers; the worker loop
/// decides retryability via [`StoreError::is_retryable`] rather than matching on
/// `Display` output, though the string form still round-trips through `last_error`
/// the same way the original Supabase client's stringified exceptions did.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("row not found")]
    NotFound,
    #[error("invalid row data: {0}")]
    InvalidRow(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked))
    }
}

/// Failures from an LLM provider call (C3). Distinguishes the `ProviderTransient`
/// and `ProviderFatal` kinds named in spec.md §7 as variants instead of string
/// matching wherever the call site has structured information; `should_retry`-style
/// substring matching is kept as a fallback for errors that cross an
/// `anyhow`/`reqwest` boundary where that structure is lost (see
/// [`crate::worker::should_retry`]). An unroutable judge (no configured provider key)
/// is a no-op at dispatch time (C5), never an error, so there is no variant for it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited by provider: {0}")]
    RateLimited(String),
    #[error("provider request timed out: {0}")]
    Timeout(String),
    #[error("provider returned an error: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_) | ProviderError::Timeout(_))
    }
}

/// Failures from submission ingestion (C9). Surfaced as validation errors; never
/// retried by the ingester itself.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("submission batch must be a non-empty array")]
    EmptyBatch,
    #[error("submission '{id}' is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },
    #[error("failed to persist submissions: {0}")]
    Store(#[from] StoreError),
}

/// Substring classification matching spec.md §4.8 step 5 / §7's `ProviderTransient`
/// row: used for errors that reach the worker loop as a plain string (e.g. from
/// `reqwest` or a downcast failure) rather than as a typed [`ProviderError`].
pub fn should_retry(err: &str) -> bool {
    let lower = err.to_lowercase();
    lower.contains("rate limit") || lower.contains("timeout") || lower.contains("429")
}
