use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    /// Capability string, e.g. `post-store`.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct PermissionPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}
