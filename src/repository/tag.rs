use anyhow::Context;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::Resource;
use crate::{
    error::{AppError, Result},
    models::{ListQuery, Page, SortColumns, Tag, TagPayload},
    slug::{SlugIndex, generate_slug},
};

macro_rules! tag_columns {
    () => {
        "id, name, slug, is_active, created_at, updated_at, deleted_at"
    };
}

const SORT: SortColumns = SortColumns(&[
    ("created_at", "created_at"),
    ("name", "name"),
    ("slug", "slug"),
]);

pub struct TagRepo {
    db: PgPool,
}

impl TagRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active tags for the public site.
    pub async fn index_active(&self, query: &ListQuery) -> Result<Page<Tag>> {
        self.list(query, &["deleted_at IS NULL", "is_active"]).await
    }

    async fn list(&self, query: &ListQuery, conditions: &[&str]) -> Result<Page<Tag>> {
        let mut count = QueryBuilder::new("SELECT count(*) FROM tags");
        query.push_filter(&mut count, conditions, &["name"]);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("Failed to count tags")?;

        let mut select = QueryBuilder::new(concat!("SELECT ", tag_columns!(), " FROM tags"));
        query.push_filter(&mut select, conditions, &["name"]);
        query.push_order_and_page(&mut select, &SORT);
        let tags = select
            .build_query_as::<Tag>()
            .fetch_all(&self.db)
            .await
            .context("Failed to list tags")?;

        Ok(query.into_page(tags, total))
    }
}

impl SlugIndex for TagRepo {
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tags
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

impl Resource for TagRepo {
    type Row = Tag;
    type Detail = Tag;
    type Store = TagPayload;
    type Update = TagPayload;

    async fn index(&self, query: &ListQuery) -> Result<Page<Tag>> {
        self.list(query, &["deleted_at IS NULL"]).await
    }

    async fn show(&self, id: Uuid) -> Result<Tag> {
        sqlx::query_as::<_, Tag>(concat!(
            "SELECT ",
            tag_columns!(),
            " FROM tags WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show tag query")?
        .ok_or(AppError::NotFound("tag"))
    }

    async fn store(&self, payload: TagPayload) -> Result<Tag> {
        let slug = generate_slug(self, &payload.name, None).await?;

        sqlx::query_as::<_, Tag>(concat!(
            "INSERT INTO tags (id, name, slug, is_active) VALUES ($1, $2, $3, $4) RETURNING ",
            tag_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name)
        .bind(slug)
        .bind(payload.is_active)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "tag", "Failed to insert tag"))
    }

    async fn update(&self, id: Uuid, payload: TagPayload) -> Result<Tag> {
        let slug = generate_slug(self, &payload.name, Some(id)).await?;

        sqlx::query_as::<_, Tag>(concat!(
            "UPDATE tags SET name = $2, slug = $3, is_active = $4, updated_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            tag_columns!()
        ))
        .bind(id)
        .bind(payload.name)
        .bind(slug)
        .bind(payload.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "tag", "Failed to update tag"))?
        .ok_or(AppError::Conflict("tag"))
    }

    async fn destroy(&self, id: Uuid) -> Result<Tag> {
        sqlx::query_as::<_, Tag>(concat!(
            "UPDATE tags SET updated_at = now(), deleted_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            tag_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute destroy tag query")?
        .ok_or(AppError::Conflict("tag"))
    }
}
