//! API Routes
//!
//! Route handlers organized by functionality.

pub mod analysis;
pub mod health;
pub mod series;

use crate::api::error::{ApiError, ApiResult};
use crate::storage::{DateBound, SeriesId, StoreResult};

/// Run a synchronous store operation off the async runtime
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Parse optional window bounds from request text
pub(crate) fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
) -> ApiResult<(Option<DateBound>, Option<DateBound>)> {
    Ok((DateBound::parse_opt(start)?, DateBound::parse_opt(end)?))
}

pub(crate) fn parse_series_ids(raw: &[String]) -> ApiResult<Vec<SeriesId>> {
    raw.iter()
        .map(|s| SeriesId::parse(s).map_err(ApiError::from))
        .collect()
}
