use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{JwtClaims, require_permission},
    error::Result,
    models::{RolePermissions, SyncPermissions},
    repository::SyncPermissionRepo,
    startup::AppState,
};

#[instrument(skip(claims, state))]
pub async fn show_role_permissions(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<RolePermissions>> {
    require_permission(&state, &claims, "sync-permission-index").await?;

    let role = SyncPermissionRepo::new(state.db.clone())
        .show(role_id)
        .await?;

    Ok(Json(role))
}

#[instrument(skip(claims, state, payload), fields(count = payload.permission_ids.len()))]
pub async fn sync_role_permissions(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<SyncPermissions>,
) -> Result<Json<RolePermissions>> {
    require_permission(&state, &claims, "sync-permission-update").await?;

    let role = SyncPermissionRepo::new(state.db.clone())
        .update(role_id, &payload.permission_ids)
        .await?;

    Ok(Json(role))
}
