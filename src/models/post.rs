use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub tag_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub thumbnail: Option<String>,
    pub content: String,
    pub keyword: Option<String>,
    pub slug: String,
    pub is_active: bool,
    pub is_highlight: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A post with its author and tag names, as shown in listings.
#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct PostDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub tag_name: Option<String>,
    pub tag_slug: Option<String>,
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct StorePost {
    /// Author, taken from the access token rather than the body.
    #[serde(skip)]
    pub user_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 2048))]
    pub thumbnail: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 255))]
    pub keyword: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_highlight: bool,
}

/// Leaving `thumbnail` out keeps the current one.
#[derive(Debug, serde::Deserialize, Validate)]
pub struct UpdatePost {
    pub tag_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 2048))]
    pub thumbnail: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(max = 255))]
    pub keyword: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_highlight: bool,
}
