//! Unauthenticated reads for the public site. Only active, non-deleted rows
//! are visible here.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    error::Result,
    models::{ListQuery, Page, PostDetail, Tag},
    repository::{PostRepo, TagRepo},
    startup::AppState,
};

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<PostDetail>>> {
    let page = PostRepo::new(state.db.clone()).index_active(&query).await?;

    Ok(Json(page))
}

pub async fn show_post(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>> {
    let post = PostRepo::new(state.db.clone())
        .show_active_by_slug(&slug)
        .await?;

    Ok(Json(post))
}

pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Tag>>> {
    let page = TagRepo::new(state.db.clone()).index_active(&query).await?;

    Ok(Json(page))
}
