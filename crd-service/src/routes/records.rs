use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crd_sdk::records::{ClientRecord, EditableField, FieldPatch};

use crate::auth::AdminAuth;
use crate::error::AppError;
use crate::server::AppState;

// ---------- GET /records ----------

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub total: usize,
    pub records: Vec<ClientRecord>,
}

/// Fetch-through search: query the registry, apply the response to the
/// cache under fetch sequencing, return the rows.
pub async fn list_records(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<RecordListResponse>, AppError> {
    let filter = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let row_cap = state.config.read().await.registry.row_cap;
    let seq = state.cache.write().await.begin_fetch();

    let records = state.registry.search(filter.as_deref(), row_cap).await?;

    if !state.cache.write().await.apply_fetch(seq, records.clone()) {
        // A later fetch already landed; this response still goes to its
        // own caller, the cache just keeps the fresher rows.
        debug!(seq, "fetch response arrived stale, cache left alone");
    }

    info!(count = records.len(), filtered = filter.is_some(), "records fetched");

    Ok(Json(RecordListResponse {
        total: records.len(),
        records,
    }))
}

// ---------- PATCH /records/{id} ----------

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub field: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateFieldResponse {
    pub id: String,
    pub field: String,
    /// The normalized value as written to the store.
    pub value: Option<String>,
}

/// Update exactly one editable field of one record.
///
/// The raw value is normalized per the field kind (dates through the
/// editable-to-stored conversion, text trimmed with blank meaning
/// clear), written to the registry, and applied to the cache only once
/// the write is acknowledged.
pub async fn update_record(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFieldRequest>,
) -> Result<Json<UpdateFieldResponse>, AppError> {
    let field = EditableField::from_wire(&req.field)
        .ok_or_else(|| AppError::Validation(format!("unknown editable field: {}", req.field)))?;

    let patch = FieldPatch::normalized(field, req.value.as_deref().unwrap_or(""), &Local);

    state.registry.update_field(&id, &patch).await?;

    if state.cache.write().await.apply_patch(&id, &patch).is_none() {
        debug!(id = %id, "updated record not in cache");
    }

    info!(id = %id, field = %field, cleared = patch.value.is_none(), "record field updated");

    Ok(Json(UpdateFieldResponse {
        id,
        field: field.wire_name().to_string(),
        value: patch.value,
    }))
}
