use anyhow::Context;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::Resource;
use crate::{
    error::{AppError, Result},
    models::{ListQuery, Page, Post, PostDetail, SortColumns, StorePost, UpdatePost},
    slug::{SlugIndex, generate_slug},
};

macro_rules! post_columns {
    () => {
        "id, tag_id, user_id, title, thumbnail, content, keyword, slug, is_active, \
         is_highlight, created_at, updated_at, deleted_at"
    };
}

macro_rules! detail_select {
    () => {
        "SELECT posts.id, posts.tag_id, posts.user_id, posts.title, posts.thumbnail, \
         posts.content, posts.keyword, posts.slug, posts.is_active, posts.is_highlight, \
         posts.created_at, posts.updated_at, posts.deleted_at, \
         users.name AS author_name, users.username AS author_username, \
         tags.name AS tag_name, tags.slug AS tag_slug \
         FROM posts \
         LEFT JOIN users ON users.id = posts.user_id \
         LEFT JOIN tags ON tags.id = posts.tag_id"
    };
}

const SEARCH: [&str; 4] = ["posts.title", "posts.content", "users.name", "tags.name"];

const SORT: SortColumns = SortColumns(&[
    ("created_at", "posts.created_at"),
    ("title", "posts.title"),
    ("slug", "posts.slug"),
    ("updated_at", "posts.updated_at"),
]);

pub struct PostRepo {
    db: PgPool,
}

impl PostRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Published posts for the public site.
    pub async fn index_active(&self, query: &ListQuery) -> Result<Page<PostDetail>> {
        self.list(query, &["posts.deleted_at IS NULL", "posts.is_active"])
            .await
    }

    pub async fn show_active_by_slug(&self, slug: &str) -> Result<PostDetail> {
        sqlx::query_as::<_, PostDetail>(concat!(
            detail_select!(),
            " WHERE posts.slug = $1 AND posts.is_active AND posts.deleted_at IS NULL"
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show post by slug query")?
        .ok_or(AppError::NotFound("post"))
    }

    async fn list(&self, query: &ListQuery, conditions: &[&str]) -> Result<Page<PostDetail>> {
        let mut count = QueryBuilder::new(
            "SELECT count(*) FROM posts \
             LEFT JOIN users ON users.id = posts.user_id \
             LEFT JOIN tags ON tags.id = posts.tag_id",
        );
        query.push_filter(&mut count, conditions, &SEARCH);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("Failed to count posts")?;

        let mut select = QueryBuilder::new(detail_select!());
        query.push_filter(&mut select, conditions, &SEARCH);
        query.push_order_and_page(&mut select, &SORT);
        let posts = select
            .build_query_as::<PostDetail>()
            .fetch_all(&self.db)
            .await
            .context("Failed to list posts")?;

        Ok(query.into_page(posts, total))
    }
}

impl SlugIndex for PostRepo {
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM posts
                WHERE slug = $1 AND deleted_at IS NULL
                AND ($2::uuid IS NULL OR id != $2)
            )
            "#,
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.db)
        .await
    }
}

impl Resource for PostRepo {
    type Row = Post;
    type Detail = PostDetail;
    type Store = StorePost;
    type Update = UpdatePost;

    async fn index(&self, query: &ListQuery) -> Result<Page<PostDetail>> {
        self.list(query, &["posts.deleted_at IS NULL"]).await
    }

    async fn show(&self, id: Uuid) -> Result<PostDetail> {
        sqlx::query_as::<_, PostDetail>(concat!(
            detail_select!(),
            " WHERE posts.id = $1 AND posts.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show post query")?
        .ok_or(AppError::NotFound("post"))
    }

    async fn store(&self, payload: StorePost) -> Result<Post> {
        let slug = generate_slug(self, &payload.title, None).await?;

        sqlx::query_as::<_, Post>(concat!(
            "INSERT INTO posts (id, tag_id, user_id, title, thumbnail, content, keyword, slug, ",
            "is_active, is_highlight) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            post_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(payload.tag_id)
        .bind(payload.user_id)
        .bind(payload.title)
        .bind(payload.thumbnail)
        .bind(payload.content)
        .bind(payload.keyword)
        .bind(slug)
        .bind(payload.is_active)
        .bind(payload.is_highlight)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "post", "Failed to insert post"))
    }

    async fn update(&self, id: Uuid, payload: UpdatePost) -> Result<Post> {
        let slug = generate_slug(self, &payload.title, Some(id)).await?;

        sqlx::query_as::<_, Post>(concat!(
            "UPDATE posts SET tag_id = $2, title = $3, thumbnail = COALESCE($4, thumbnail), ",
            "content = $5, keyword = $6, slug = $7, is_active = $8, is_highlight = $9, ",
            "updated_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            post_columns!()
        ))
        .bind(id)
        .bind(payload.tag_id)
        .bind(payload.title)
        .bind(payload.thumbnail)
        .bind(payload.content)
        .bind(payload.keyword)
        .bind(slug)
        .bind(payload.is_active)
        .bind(payload.is_highlight)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "post", "Failed to update post"))?
        .ok_or(AppError::Conflict("post"))
    }

    async fn destroy(&self, id: Uuid) -> Result<Post> {
        sqlx::query_as::<_, Post>(concat!(
            "UPDATE posts SET updated_at = now(), deleted_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            post_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute destroy post query")?
        .ok_or(AppError::Conflict("post"))
    }
}
