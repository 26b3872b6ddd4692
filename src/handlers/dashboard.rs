//! Permission-gated CRUD endpoints shared by every dashboard resource.
//!
//! Each handler is generic over a [`DashboardResource`] and is mounted once
//! per entity, e.g. `get(index::<PostRepo>)`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{JwtClaims, require_permission},
    error::Result,
    models::{ListQuery, Page, StorePost, User},
    repository::{PermissionRepo, PostRepo, Resource, RoleRepo, TagRepo, UserRepo},
    startup::AppState,
};

/// Permission names guarding the five operations of one resource.
pub struct Guards {
    pub index: &'static str,
    pub show: &'static str,
    pub store: &'static str,
    pub update: &'static str,
    pub destroy: &'static str,
}

pub trait DashboardResource:
    Resource<
        Row: Serialize + Send,
        Detail: Serialize + Send,
        Store: DeserializeOwned + Validate + Send,
        Update: DeserializeOwned + Validate + Send,
    > + Send
    + Sync
    + Sized
{
    const GUARDS: Guards;

    fn from_pool(db: PgPool) -> Self;

    /// Fill in payload fields owned by the caller rather than the body.
    fn authored(payload: Self::Store, _author: &User) -> Self::Store {
        payload
    }
}

impl DashboardResource for RoleRepo {
    const GUARDS: Guards = Guards {
        index: "role-index",
        show: "role-show",
        store: "role-store",
        update: "role-update",
        destroy: "role-destroy",
    };

    fn from_pool(db: PgPool) -> Self {
        Self::new(db)
    }
}

impl DashboardResource for PermissionRepo {
    const GUARDS: Guards = Guards {
        index: "permission-index",
        show: "permission-show",
        store: "permission-store",
        update: "permission-update",
        destroy: "permission-destroy",
    };

    fn from_pool(db: PgPool) -> Self {
        Self::new(db)
    }
}

impl DashboardResource for UserRepo {
    const GUARDS: Guards = Guards {
        index: "user-index",
        show: "user-show",
        store: "user-store",
        update: "user-update",
        destroy: "user-destroy",
    };

    fn from_pool(db: PgPool) -> Self {
        Self::new(db)
    }
}

impl DashboardResource for TagRepo {
    const GUARDS: Guards = Guards {
        index: "tags-index",
        show: "tags-show",
        store: "tags-store",
        update: "tags-update",
        destroy: "tags-destroy",
    };

    fn from_pool(db: PgPool) -> Self {
        Self::new(db)
    }
}

impl DashboardResource for PostRepo {
    const GUARDS: Guards = Guards {
        index: "post-index",
        show: "post-show",
        store: "post-store",
        update: "post-update",
        destroy: "post-destroy",
    };

    fn from_pool(db: PgPool) -> Self {
        Self::new(db)
    }

    fn authored(payload: StorePost, author: &User) -> StorePost {
        StorePost {
            user_id: Some(author.id),
            ..payload
        }
    }
}

pub async fn index<R: DashboardResource>(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<R::Detail>>> {
    require_permission(&state, &claims, R::GUARDS.index).await?;

    let page = R::from_pool(state.db.clone()).index(&query).await?;

    Ok(Json(page))
}

pub async fn show<R: DashboardResource>(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<R::Detail>> {
    require_permission(&state, &claims, R::GUARDS.show).await?;

    let item = R::from_pool(state.db.clone()).show(id).await?;

    Ok(Json(item))
}

pub async fn store<R: DashboardResource>(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<R::Store>,
) -> Result<(StatusCode, Json<R::Row>)> {
    let author = require_permission(&state, &claims, R::GUARDS.store).await?;
    payload.validate()?;

    let item = R::from_pool(state.db.clone())
        .store(R::authored(payload, &author))
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update<R: DashboardResource>(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<R::Update>,
) -> Result<Json<R::Row>> {
    require_permission(&state, &claims, R::GUARDS.update).await?;
    payload.validate()?;

    let item = R::from_pool(state.db.clone()).update(id, payload).await?;

    Ok(Json(item))
}

pub async fn destroy<R: DashboardResource>(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<R::Row>> {
    require_permission(&state, &claims, R::GUARDS.destroy).await?;

    let item = R::from_pool(state.db.clone()).destroy(id).await?;

    Ok(Json(item))
}
