//! Versioned artifact upload endpoint.

use super::common::blocking;
use crate::auth::AuthenticatedActor;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use reclaim_core::UploadRequest;
use serde::{Deserialize, Serialize};

fn default_file_name() -> String {
    "artifact.bin".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub version: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default, rename = "override")]
    pub override_existing: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub entity: String,
    pub version: String,
    pub location: String,
    pub bytes_written: u64,
    pub replaced: bool,
}

/// POST /books/{id}/upload
pub async fn upload_book(
    State(state): State<AppState>,
    Extension(AuthenticatedActor(actor)): Extension<AuthenticatedActor>,
    Path(entity): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    let request = UploadRequest {
        entity: entity.clone(),
        version: params.version.clone(),
        file_name: params.file_name,
        data: body.to_vec(),
        override_existing: params.override_existing,
    };

    let outcome = blocking(move || Ok(state.uploads.upload(request)?)).await?;
    tracing::info!(
        actor = %actor,
        entity = %entity,
        version = %params.version,
        replaced = outcome.replaced_objects,
        "book artifact uploaded"
    );

    Ok(Json(UploadResponse {
        entity,
        version: params.version,
        location: outcome.group.to_string(),
        bytes_written: outcome.bytes_written,
        replaced: outcome.replaced_objects > 0,
    }))
}
