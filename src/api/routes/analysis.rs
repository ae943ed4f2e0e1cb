//! Analysis Routes
//!
//! Multi-series views built on the aligner.
//!
//! - POST /api/v1/align - Outer-join series onto one time axis (JSON or CSV)
//! - POST /api/v1/calculate - Evaluate an expression over aligned series
//! - POST /api/v1/scatter - Align two series and fit a line

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{blocking, parse_series_ids, parse_window};
use crate::api::dto::{
    AlignRequest, CalculateRequest, CalculateResponse, OutputFormat, ScatterRequest, ScatterResponse,
};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::align::{column_name, linear_fit};
use crate::expression::evaluate_outcome;
use crate::storage::SeriesId;

/// POST /api/v1/align
///
/// Columns are named `m_0`, `m_1`, ... in request order.
pub async fn align(State(state): State<Arc<AppState>>, Json(req): Json<AlignRequest>) -> ApiResult<Response> {
    let ids = parse_series_ids(&req.series)?;
    let (start, end) = parse_window(req.start.as_deref(), req.end.as_deref())?;

    let aligner = state.aligner.clone();
    let alignment = blocking(move || aligner.align(&ids, start.as_ref(), end.as_ref())).await?;

    match req.format {
        OutputFormat::Json => Ok(Json(alignment).into_response()),
        OutputFormat::Csv => {
            let body = alignment.table.to_csv_string()?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], body).into_response())
        }
    }
}

/// POST /api/v1/calculate
///
/// Expression failures are part of a successful response: the `result`
/// field holds the error message instead of values.
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateRequest>,
) -> ApiResult<Json<CalculateResponse>> {
    let ids = parse_series_ids(&req.series)?;
    let (start, end) = parse_window(req.start.as_deref(), req.end.as_deref())?;
    let (preview_start, preview_end) = parse_window(req.preview_start.as_deref(), req.preview_end.as_deref())?;

    let aligner = state.aligner.clone();
    let alignment = blocking(move || aligner.align(&ids, start.as_ref(), end.as_ref())).await?;

    let table = alignment
        .table
        .filter_range(preview_start.as_ref(), preview_end.as_ref());
    let result = evaluate_outcome(&req.expression, &table);

    Ok(Json(CalculateResponse {
        table,
        descriptors: alignment.descriptors,
        result,
    }))
}

/// POST /api/v1/scatter
///
/// `x` becomes column `m_0` and `y` column `m_1`.
pub async fn scatter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScatterRequest>,
) -> ApiResult<Json<ScatterResponse>> {
    let ids = vec![SeriesId::parse(&req.x)?, SeriesId::parse(&req.y)?];
    let (start, end) = parse_window(req.start.as_deref(), req.end.as_deref())?;

    let aligner = state.aligner.clone();
    let alignment = blocking(move || aligner.align(&ids, start.as_ref(), end.as_ref())).await?;
    let fit = linear_fit(&alignment.table, &column_name(0), &column_name(1))?;

    Ok(Json(ScatterResponse {
        table: alignment.table,
        descriptors: alignment.descriptors,
        fit,
    }))
}
