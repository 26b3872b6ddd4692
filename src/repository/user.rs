use anyhow::Context;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::Resource;
use crate::{
    auth::hash_password,
    error::{AppError, Result},
    models::{ListQuery, Page, SortColumns, StoreUser, UpdateUser, User, UserSummary},
};

macro_rules! user_columns {
    () => {
        "id, name, username, email, password, role_id, email_verified_at, is_active, \
         created_at, updated_at, deleted_at"
    };
}

macro_rules! summary_columns {
    () => {
        "users.id, users.name, users.username, users.email, users.role_id, \
         roles.name AS role_name, users.is_active, users.email_verified_at, \
         users.created_at, users.updated_at, users.deleted_at"
    };
}

const SORT: SortColumns = SortColumns(&[
    ("created_at", "users.created_at"),
    ("name", "users.name"),
    ("username", "users.username"),
    ("email", "users.email"),
]);

pub struct UserRepo {
    db: PgPool,
}

impl UserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl Resource for UserRepo {
    type Row = User;
    type Detail = UserSummary;
    type Store = StoreUser;
    type Update = UpdateUser;

    async fn index(&self, query: &ListQuery) -> Result<Page<UserSummary>> {
        let conditions = ["users.deleted_at IS NULL"];
        let search = ["users.name", "users.email", "users.username"];

        let mut count = QueryBuilder::new("SELECT count(*) FROM users");
        query.push_filter(&mut count, &conditions, &search);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("Failed to count users")?;

        let mut select = QueryBuilder::new(concat!(
            "SELECT ",
            summary_columns!(),
            " FROM users LEFT JOIN roles ON roles.id = users.role_id"
        ));
        query.push_filter(&mut select, &conditions, &search);
        query.push_order_and_page(&mut select, &SORT);
        let users = select
            .build_query_as::<UserSummary>()
            .fetch_all(&self.db)
            .await
            .context("Failed to list users")?;

        Ok(query.into_page(users, total))
    }

    async fn show(&self, id: Uuid) -> Result<UserSummary> {
        sqlx::query_as::<_, UserSummary>(concat!(
            "SELECT ",
            summary_columns!(),
            " FROM users LEFT JOIN roles ON roles.id = users.role_id ",
            "WHERE users.id = $1 AND users.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute show user query")?
        .ok_or(AppError::NotFound("user"))
    }

    async fn store(&self, payload: StoreUser) -> Result<User> {
        let StoreUser {
            name,
            username,
            email,
            password,
            role_id,
        } = payload;
        let password_hash = hash_password(password).await?;

        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (id, name, username, email, password, role_id) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            user_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "user", "Failed to insert user"))
    }

    async fn update(&self, id: Uuid, payload: UpdateUser) -> Result<User> {
        let UpdateUser {
            name,
            username,
            email,
            password,
            role_id,
        } = payload;
        let password_hash = match password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET name = $2, username = $3, email = $4, role_id = $5, ",
            "password = COALESCE($6, password), updated_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(name)
        .bind(username)
        .bind(email)
        .bind(role_id)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "user", "Failed to update user"))?
        .ok_or(AppError::Conflict("user"))
    }

    async fn destroy(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET updated_at = now(), deleted_at = now() ",
            "WHERE id = $1 AND deleted_at IS NULL RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute destroy user query")?
        .ok_or(AppError::Conflict("user"))
    }
}
