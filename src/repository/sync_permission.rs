use anyhow::Context;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Permission, RolePermissions},
};

/// Reads and replaces the permission set of a role.
pub struct SyncPermissionRepo {
    db: PgPool,
}

impl SyncPermissionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn show(&self, role_id: Uuid) -> Result<RolePermissions> {
        let name = role_name(&self.db, role_id)
            .await
            .context("Failed to look up role")?
            .ok_or(AppError::NotFound("role"))?;

        let permissions = assigned_permissions(&self.db, role_id)
            .await
            .context("Failed to list role permissions")?;

        Ok(RolePermissions {
            id: role_id,
            name,
            permissions,
        })
    }

    /// Replace the role's permissions with `permission_ids` atomically.
    ///
    /// Every id must name a live permission; otherwise nothing changes and
    /// `TransactionFailure` is returned.
    pub async fn update(&self, role_id: Uuid, permission_ids: &[Uuid]) -> Result<RolePermissions> {
        let mut transaction = self
            .db
            .begin()
            .await
            .context("Failed to start transaction")?;

        // lock the role row so concurrent syncs of one role serialize
        let name: String = sqlx::query_scalar(
            "SELECT name FROM roles WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(role_id)
        .fetch_optional(&mut *transaction)
        .await
        .context("Failed to look up role")?
        .ok_or(AppError::NotFound("role"))?;

        sqlx::query("DELETE FROM role_has_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *transaction)
            .await
            .context("Failed to clear role permissions")?;

        for permission_id in permission_ids {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM permissions WHERE id = $1 AND deleted_at IS NULL)",
            )
            .bind(permission_id)
            .fetch_one(&mut *transaction)
            .await
            .context("Failed to check permission")?;

            if !exists {
                transaction
                    .rollback()
                    .await
                    .context("Failed to rollback transaction")?;

                return Err(AppError::TransactionFailure(format!(
                    "permission {permission_id} does not exist"
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO role_has_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *transaction)
            .await
            .context("Failed to assign permission")?;
        }

        let permissions = assigned_permissions(&mut *transaction, role_id)
            .await
            .context("Failed to list role permissions")?;

        transaction
            .commit()
            .await
            .context("Failed to commit transaction")?;

        tracing::info!(%role_id, count = permissions.len(), "Synced role permissions");

        Ok(RolePermissions {
            id: role_id,
            name,
            permissions,
        })
    }
}

async fn role_name<'e>(db: impl PgExecutor<'e>, role_id: Uuid) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar("SELECT name FROM roles WHERE id = $1 AND deleted_at IS NULL")
        .bind(role_id)
        .fetch_optional(db)
        .await
}

async fn assigned_permissions<'e>(
    db: impl PgExecutor<'e>,
    role_id: Uuid,
) -> sqlx::Result<Vec<Permission>> {
    sqlx::query_as::<_, Permission>(
        r#"
        SELECT permissions.id, permissions.name, permissions.created_at,
               permissions.updated_at, permissions.deleted_at
        FROM role_has_permissions
        JOIN permissions ON permissions.id = role_has_permissions.permission_id
        WHERE role_has_permissions.role_id = $1 AND permissions.deleted_at IS NULL
        ORDER BY permissions.name
        "#,
    )
    .bind(role_id)
    .fetch_all(db)
    .await
}
