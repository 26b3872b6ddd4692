use anyhow::Context;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::Resource;
use crate::{
    error::{AppError, Result},
    models::{ListQuery, Page, Permission, PermissionPayload, SortColumns},
};

macro_rules! permission_columns {
    () => {
        "id, name, created_at, updated_at, deleted_at"
    };
}

const SORT: SortColumns = SortColumns(&[("name", "name"), ("created_at", "created_at")]);

pub struct PermissionRepo {
    db: PgPool,
}

impl PermissionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl Resource for PermissionRepo {
    type Row = Permission;
    type Detail = Permission;
    type Store = PermissionPayload;
    type Update = PermissionPayload;

    async fn index(&self, query: &ListQuery) -> Result<Page<Permission>> {
        let conditions = ["deleted_at IS NULL"];

        let mut count = QueryBuilder::new("SELECT count(*) FROM permissions");
        query.push_filter(&mut count, &conditions, &["name"]);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("Failed to count permissions")?;

        let mut select = QueryBuilder::new(concat!(
            "SELECT ",
            permission_columns!(),
            " FROM permissions"
        ));
        query.push_filter(&mut select, &conditions, &["name"]);
        query.push_order_and_page(&mut select, &SORT);
        let permissions = select
            .build_query_as::<Permission>()
            .fetch_all(&self.db)
            .await
            .context("Failed to list permissions")?;

        Ok(query.into_page(permissions, total))
    }

    async fn show(&self, id: Uuid) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(concat!(
            "SELECT ",
            permission_columns!(),
            " FROM permissions WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show permission query")?
        .ok_or(AppError::NotFound("permission"))
    }

    async fn store(&self, payload: PermissionPayload) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(concat!(
            "INSERT INTO permissions (id, name) VALUES ($1, $2) RETURNING ",
            permission_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "permission", "Failed to insert permission"))
    }

    async fn update(&self, id: Uuid, payload: PermissionPayload) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(concat!(
            "UPDATE permissions SET name = $2, updated_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            permission_columns!()
        ))
        .bind(id)
        .bind(payload.name)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "permission", "Failed to update permission"))?
        .ok_or(AppError::Conflict("permission"))
    }

    async fn destroy(&self, id: Uuid) -> Result<Permission> {
        sqlx::query_as::<_, Permission>(concat!(
            "UPDATE permissions SET updated_at = now(), deleted_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            permission_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute destroy permission query")?
        .ok_or(AppError::Conflict("permission"))
    }
}
