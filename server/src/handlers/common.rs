//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use reclaim_core::types::TrashKey;
use std::time::SystemTime;

/// Runs a synchronous core call on the blocking pool.
pub async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
}

pub fn parse_key(key: &str) -> ApiResult<TrashKey> {
    TrashKey::try_new(key).map_err(|e| ApiError::BadRequest(format!("invalid key: {e}")))
}

pub fn timestamp(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}
