//! Trash endpoints.

use super::common::{blocking, parse_key, timestamp};
use crate::auth::AuthenticatedActor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use reclaim_core::types::{
    AuditAction, Bucket, ItemType, Metadata, ObjectPath, OverrideAudit, canonicalize_metadata,
};
use reclaim_core::{TrashEntry, TrashRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct TrashEntryResponse {
    pub key: String,
    pub bucket: String,
    pub path: String,
    pub item_type: ItemType,
    pub label: String,
    pub object_count: u64,
    pub total_size: u64,
    pub metadata: Metadata,
    pub trashed_at: DateTime<Utc>,
    pub trashed_by: String,
    pub youngest_last_modified: DateTime<Utc>,
    pub eligible_at: DateTime<Utc>,
    pub eligible_for_deletion: bool,
    pub retention_secs: u64,
}

impl From<TrashEntry> for TrashEntryResponse {
    fn from(projection: TrashEntry) -> Self {
        let entry = projection.entry;
        Self {
            key: entry.key.to_string(),
            bucket: entry.bucket.to_string(),
            path: entry.path.to_string(),
            item_type: entry.item_type,
            label: projection.label,
            object_count: entry.object_count,
            total_size: entry.total_size,
            metadata: entry.metadata,
            trashed_at: timestamp(entry.trashed_at),
            trashed_by: entry.trashed_by.to_string(),
            youngest_last_modified: timestamp(entry.youngest_last_modified),
            eligible_at: timestamp(entry.eligible_at),
            eligible_for_deletion: projection.eligible_for_deletion,
            retention_secs: entry.retention.retention.as_secs(),
        }
    }
}

/// GET /storage/trash
pub async fn list_trash(State(state): State<AppState>) -> ApiResult<Json<Vec<TrashEntryResponse>>> {
    let entries = blocking(move || Ok(state.trash.list()?)).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct TrashItemRequest {
    pub bucket: String,
    pub path: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// POST /storage/trash
pub async fn trash_item(
    State(state): State<AppState>,
    Extension(AuthenticatedActor(actor)): Extension<AuthenticatedActor>,
    Json(body): Json<TrashItemRequest>,
) -> ApiResult<(StatusCode, Json<TrashEntryResponse>)> {
    let request = TrashRequest {
        bucket: Bucket::try_new(body.bucket)
            .map_err(|e| ApiError::BadRequest(format!("invalid bucket: {e}")))?,
        path: ObjectPath::try_new(body.path)
            .map_err(|e| ApiError::BadRequest(format!("invalid path: {e}")))?,
        item_type: body.item_type,
        metadata: canonicalize_metadata(body.metadata),
    };

    let entry = blocking(move || Ok(state.trash.trash(request, &actor)?)).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[derive(Debug, Deserialize)]
pub struct DeleteTrashRequest {
    pub key: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub override_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteTrashResponse {
    pub deleted_key: String,
    pub objects_deleted: u64,
    pub overridden: bool,
}

/// DELETE /storage/trash
pub async fn delete_trash(
    State(state): State<AppState>,
    Extension(AuthenticatedActor(actor)): Extension<AuthenticatedActor>,
    Json(body): Json<DeleteTrashRequest>,
) -> ApiResult<Json<DeleteTrashResponse>> {
    let key = parse_key(&body.key)?;

    let deleted_key = key.to_string();
    let result = blocking(move || {
        Ok(state
            .trash
            .delete(&key, body.force, body.override_reason.as_deref(), &actor)?)
    })
    .await?;

    Ok(Json(DeleteTrashResponse {
        deleted_key,
        objects_deleted: result.objects_deleted,
        overridden: result.overridden,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored_key: String,
    pub objects_moved: u64,
    pub item_type: ItemType,
}

/// POST /storage/restore
pub async fn restore_trash(
    State(state): State<AppState>,
    Extension(AuthenticatedActor(actor)): Extension<AuthenticatedActor>,
    Json(body): Json<RestoreRequest>,
) -> ApiResult<Json<RestoreResponse>> {
    let key = parse_key(&body.key)?;
    let result = blocking(move || Ok(state.trash.restore(&key, &actor)?)).await?;

    Ok(Json(RestoreResponse {
        restored_key: result.restored_key.to_string(),
        objects_moved: result.objects_moved,
        item_type: result.item_type,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct AuditRecordResponse {
    pub key: String,
    pub label: String,
    pub actor: String,
    pub justification: String,
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    pub eligible_at: DateTime<Utc>,
}

impl From<OverrideAudit> for AuditRecordResponse {
    fn from(record: OverrideAudit) -> Self {
        Self {
            key: record.key.to_string(),
            label: record.label,
            actor: record.actor.to_string(),
            justification: record.justification.to_string(),
            at: timestamp(record.at),
            action: record.action,
            eligible_at: timestamp(record.eligible_at),
        }
    }
}

/// GET /storage/audit?key=
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditRecordResponse>>> {
    let key = parse_key(&query.key)?;
    let records = blocking(move || Ok(state.trash.audit(&key)?)).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
