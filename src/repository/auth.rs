use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::User,
    seeder::INACTIVE,
};

macro_rules! user_columns {
    () => {
        "id, name, username, email, password, role_id, email_verified_at, is_active, \
         created_at, updated_at, deleted_at"
    };
}

/// Queries behind registration, login, verification and password reset.
pub struct AuthRepo {
    db: PgPool,
}

impl AuthRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find a live user whose username or email equals `login`.
    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE (username = $1 OR email = $1) AND deleted_at IS NULL LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute find user by login query")?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute find user by id query")?;

        Ok(user)
    }

    /// Insert a new account holding the `Inactive` role, or no role when
    /// that role has not been seeded.
    pub async fn register(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let inactive_role: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM roles WHERE name = $1 AND deleted_at IS NULL LIMIT 1",
        )
        .bind(INACTIVE)
        .fetch_optional(&self.db)
        .await
        .context("Failed to look up the inactive role")?;

        if inactive_role.is_none() {
            tracing::warn!("Role {INACTIVE} is missing, registering {username} without a role");
        }

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
        .bind(inactive_role)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "user", "Failed to insert user"))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = $1 AND deleted_at IS NULL"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute find user by username query")?;

        Ok(user)
    }

    /// Mark an unverified account verified, activate it and move it to the
    /// `verified` role. An account that is already verified yields `InvalidToken`.
    pub async fn verify(&self, user_id: Uuid) -> Result<User> {
        let verified_role: Uuid = sqlx::query_scalar(
            "SELECT id FROM roles WHERE lower(name) = 'verified' AND deleted_at IS NULL LIMIT 1",
        )
        .fetch_optional(&self.db)
        .await
        .context("Failed to look up the verified role")?
        .ok_or(AppError::NotFound("role"))?;

        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET email_verified_at = now(), is_active = true, updated_at = now(), ",
            "role_id = $1 WHERE id = $2 AND email_verified_at IS NULL AND deleted_at IS NULL ",
            "RETURNING ",
            user_columns!()
        ))
        .bind(verified_role)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute verify user query")?
        .ok_or(AppError::InvalidToken)
    }

    /// Swap `current_hash` for `new_hash`. If the stored hash is no longer
    /// `current_hash` nothing changes and `InvalidToken` is returned.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_hash: &str,
        new_hash: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET password = $1, updated_at = now() ",
            "WHERE id = $2 AND password = $3 AND deleted_at IS NULL RETURNING ",
            user_columns!()
        ))
        .bind(new_hash)
        .bind(user_id)
        .bind(current_hash)
        .fetch_optional(&self.db)
        .await
        .context("Failed to execute change password query")?
        .ok_or(AppError::InvalidToken)
    }
}
