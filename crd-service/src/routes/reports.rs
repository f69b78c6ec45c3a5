use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crd_sdk::export::export_filename;
use crd_sdk::records::ClientRecord;
use crd_sdk::upcoming::{UpcomingRecord, upcoming_window};
use crd_sdk::weekly::{WeekBucket, weekly_buckets};

use crate::auth::AdminAuth;
use crate::error::AppError;
use crate::export::write_workbook;
use crate::server::AppState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Derive the window from the cached rows in the host timezone.
async fn window_for(state: &AppState, range: &RangeQuery) -> Vec<UpcomingRecord> {
    let cache = state.cache.read().await;
    upcoming_window(cache.rows(), range.start, range.end, &Local)
}

// ---------- GET /reports/upcoming ----------

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub count: usize,
    pub records: Vec<ClientRecord>,
}

pub async fn upcoming(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<UpcomingResponse>, AppError> {
    let window = window_for(&state, &range).await;
    info!(start = %range.start, end = %range.end, count = window.len(), "upcoming window derived");
    Ok(Json(UpcomingResponse {
        start: range.start,
        end: range.end,
        count: window.len(),
        records: window.into_iter().map(|entry| entry.record).collect(),
    }))
}

// ---------- GET /reports/weekly ----------

#[derive(Debug, Serialize)]
pub struct WeeklyResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub buckets: Vec<WeekBucket>,
}

pub async fn weekly(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<WeeklyResponse>, AppError> {
    let window = window_for(&state, &range).await;
    let buckets = weekly_buckets(&window, &Local);
    info!(start = %range.start, end = %range.end, buckets = buckets.len(), "weekly trend derived");
    Ok(Json(WeeklyResponse {
        start: range.start,
        end: range.end,
        buckets,
    }))
}

// ---------- GET /reports/export ----------

pub async fn export(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, AppError> {
    let window = window_for(&state, &range).await;
    let bytes = write_workbook(&window)?;
    let filename = export_filename(range.start, range.end);

    info!(start = %range.start, end = %range.end, rows = window.len(), filename = %filename, "export produced");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
