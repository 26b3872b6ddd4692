use anyhow::Context;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::Resource;
use crate::{
    error::{AppError, Result},
    models::{ListQuery, Page, Role, RolePayload, SortColumns},
};

macro_rules! role_columns {
    () => {
        "id, name, is_active, created_at, updated_at, deleted_at"
    };
}

const SORT: SortColumns = SortColumns(&[("created_at", "created_at"), ("name", "name")]);

pub struct RoleRepo {
    db: PgPool,
}

impl RoleRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl Resource for RoleRepo {
    type Row = Role;
    type Detail = Role;
    type Store = RolePayload;
    type Update = RolePayload;

    async fn index(&self, query: &ListQuery) -> Result<Page<Role>> {
        let conditions = ["deleted_at IS NULL"];

        let mut count = QueryBuilder::new("SELECT count(*) FROM roles");
        query.push_filter(&mut count, &conditions, &["name"]);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("Failed to count roles")?;

        let mut select = QueryBuilder::new(concat!("SELECT ", role_columns!(), " FROM roles"));
        query.push_filter(&mut select, &conditions, &["name"]);
        query.push_order_and_page(&mut select, &SORT);
        let roles = select
            .build_query_as::<Role>()
            .fetch_all(&self.db)
            .await
            .context("Failed to list roles")?;

        Ok(query.into_page(roles, total))
    }

    async fn show(&self, id: Uuid) -> Result<Role> {
        sqlx::query_as::<_, Role>(concat!(
            "SELECT ",
            role_columns!(),
            " FROM roles WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show role query")?
        .ok_or(AppError::NotFound("role"))
    }

    async fn store(&self, payload: RolePayload) -> Result<Role> {
        sqlx::query_as::<_, Role>(concat!(
            "INSERT INTO roles (id, name, is_active) VALUES ($1, $2, $3) RETURNING ",
            role_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(payload.name)
        .bind(payload.is_active)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "role", "Failed to insert role"))
    }

    async fn update(&self, id: Uuid, payload: RolePayload) -> Result<Role> {
        sqlx::query_as::<_, Role>(concat!(
            "UPDATE roles SET name = $2, is_active = $3, updated_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            role_columns!()
        ))
        .bind(id)
        .bind(payload.name)
        .bind(payload.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "role", "Failed to update role"))?
        .ok_or(AppError::Conflict("role"))
    }

    async fn destroy(&self, id: Uuid) -> Result<Role> {
        sqlx::query_as::<_, Role>(concat!(
            "UPDATE roles SET updated_at = now(), deleted_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            role_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute destroy role query")?
        .ok_or(AppError::Conflict("role"))
    }
}
