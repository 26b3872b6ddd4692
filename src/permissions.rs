//! Permission resolution.
//!
//! A user holds at most one role; the role's effective permissions are exactly
//! the permission names linked to it through `role_has_permissions`. Nothing
//! is cached, every caller resolves from the current rows.

use std::future::Future;

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The user has no role, or the referenced role row is gone.
    #[error("role {0:?} not found")]
    RoleNotFound(Option<Uuid>),

    #[error("permission lookup failed")]
    Query(#[from] sqlx::Error),
}

/// The role name and flattened permission names of one role.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EffectiveAccess {
    pub role: String,
    pub permissions: Vec<String>,
}

impl EffectiveAccess {
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Read access to roles and their permission assignments.
pub trait RoleDirectory {
    fn role_name(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;

    fn permission_names(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> + Send;
}

impl RoleDirectory for PgPool {
    async fn role_name(&self, role_id: Uuid) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar("SELECT name FROM roles WHERE id = $1 AND deleted_at IS NULL")
            .bind(role_id)
            .fetch_optional(self)
            .await
    }

    async fn permission_names(&self, role_id: Uuid) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT permissions.name
            FROM role_has_permissions
            JOIN permissions ON permissions.id = role_has_permissions.permission_id
            WHERE role_has_permissions.role_id = $1 AND permissions.deleted_at IS NULL
            ORDER BY permissions.name
            "#,
        )
        .bind(role_id)
        .fetch_all(self)
        .await
    }
}

/// Resolve the role name and permission names for a user's role reference.
pub async fn resolve_permissions<D>(
    directory: &D,
    role_id: Option<Uuid>,
) -> Result<EffectiveAccess, ResolveError>
where
    D: RoleDirectory + ?Sized,
{
    let id = role_id.ok_or(ResolveError::RoleNotFound(None))?;

    let role = directory
        .role_name(id)
        .await?
        .ok_or(ResolveError::RoleNotFound(Some(id)))?;

    let permissions = directory.permission_names(id).await?;

    Ok(EffectiveAccess { role, permissions })
}
