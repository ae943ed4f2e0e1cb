//! Series Routes
//!
//! Catalog browsing, record retrieval and single-series views.
//!
//! - GET /api/v1/series - List all series (cached)
//! - GET /api/v1/series/:id - Get one descriptor
//! - DELETE /api/v1/series/:id - Delete a series and all its records
//! - GET /api/v1/series/:id/data - Records within a window
//! - GET /api/v1/series/:id/heatmap - Hour-by-day grid
//! - GET /api/v1/series/:id/profile - Average daily curve
//! - GET /api/v1/measurements/:msr - Descriptor by measurement point

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::{blocking, parse_window};
use crate::align::{PivotGrid, ProfilePoint};
use crate::api::dto::{DataResponse, DeleteResponse, SeriesListResponse, SeriesSummary, WindowParams};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{SeriesId, StoreError};

/// GET /api/v1/series
///
/// List every series descriptor with its label.
pub async fn list_series(State(state): State<Arc<AppState>>) -> ApiResult<Json<SeriesListResponse>> {
    let st = Arc::clone(&state);
    let descriptors = blocking(move || {
        let mut cache = st.lock_cache()?;
        let descriptors = cache.descriptors(&st.catalog)?.to_vec();
        Ok(descriptors)
    })
    .await?;

    let series: Vec<SeriesSummary> = descriptors.into_iter().map(SeriesSummary::from).collect();
    Ok(Json(SeriesListResponse {
        total: series.len(),
        series,
    }))
}

/// GET /api/v1/series/:id
pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SeriesSummary>> {
    let id = SeriesId::parse(&id)?;
    let catalog = state.catalog.clone();
    let lookup = id.clone();
    let descriptor = blocking(move || catalog.find_by_series_id(&lookup))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Series {} not found", id)))?;

    Ok(Json(SeriesSummary::from(descriptor)))
}

/// DELETE /api/v1/series/:id
///
/// Removes the descriptor and all its records in one transaction, then
/// drops the cached descriptor list.
pub async fn delete_series(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = SeriesId::parse(&id)?;
    let st = Arc::clone(&state);
    let target = id.clone();
    let deleted = blocking(move || {
        let mut cache = st.lock_cache()?;
        cache.delete(&st.catalog, &target)
    })
    .await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("Series {} not found", id)));
    }

    tracing::info!(series_id = %id, "Deleted series");
    Ok(Json(DeleteResponse {
        series_id: id,
        deleted,
    }))
}

/// GET /api/v1/series/:id/data?start=&end=
pub async fn series_data(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<DataResponse>> {
    let id = SeriesId::parse(&id)?;
    let (start, end) = parse_window(params.start.as_deref(), params.end.as_deref())?;

    let catalog = state.catalog.clone();
    let store = state.store.clone();
    let lookup = id.clone();
    let records = blocking(move || {
        if catalog.find_by_series_id(&lookup)?.is_none() {
            return Err(StoreError::NotFound(format!("series {}", lookup)));
        }
        store.query(&lookup, start.as_ref(), end.as_ref())
    })
    .await?;

    Ok(Json(DataResponse {
        series_id: id,
        total: records.len(),
        records,
    }))
}

/// GET /api/v1/series/:id/heatmap?start=&end=
pub async fn series_heatmap(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<PivotGrid>> {
    let id = SeriesId::parse(&id)?;
    let (start, end) = parse_window(params.start.as_deref(), params.end.as_deref())?;

    let aligner = state.aligner.clone();
    let grid = blocking(move || aligner.pivot_hour_by_day(&id, start.as_ref(), end.as_ref())).await?;
    Ok(Json(grid))
}

/// GET /api/v1/series/:id/profile?start=&end=
pub async fn series_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> ApiResult<Json<Vec<ProfilePoint>>> {
    let id = SeriesId::parse(&id)?;
    let (start, end) = parse_window(params.start.as_deref(), params.end.as_deref())?;

    let aligner = state.aligner.clone();
    let profile = blocking(move || aligner.hourly_profile(&id, start.as_ref(), end.as_ref())).await?;
    Ok(Json(profile))
}

/// GET /api/v1/measurements/:msr
///
/// 404 when no series has this measurement point, 409 when several do.
pub async fn find_measurement(
    State(state): State<Arc<AppState>>,
    Path(msr): Path<String>,
) -> ApiResult<Json<SeriesSummary>> {
    let catalog = state.catalog.clone();
    let descriptor = blocking(move || catalog.find_by_measurement(&msr)).await?;
    Ok(Json(SeriesSummary::from(descriptor)))
}
