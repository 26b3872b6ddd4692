use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct RolePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A role together with every permission assigned to it.
#[derive(Debug, serde::Serialize)]
pub struct RolePermissions {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<super::Permission>,
}

/// Replacement set for a role's permission assignments.
#[derive(Debug, serde::Deserialize)]
pub struct SyncPermissions {
    pub permission_ids: Vec<Uuid>,
}
