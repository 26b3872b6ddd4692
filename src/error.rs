use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{permissions::ResolveError, slug::SlugError};

/// Postgres SQLSTATEs surfaced as client errors.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A write matched no row although the caller expected the target to exist.
    #[error("{0} no longer exists")]
    Conflict(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transaction aborted: {0}")]
    TransactionFailure(String),

    #[error("Bad credentials")]
    BadCredentials { username: String, exists: bool },

    #[error("Missing permission {0}")]
    Forbidden(&'static str),

    #[error("Authorize required in this request")]
    MissingToken,

    #[error("Unsupported token type")]
    UnsupportedTokenType,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Map a failed write: unique violations become `AlreadyExists`, dangling
    /// references become `Validation`, anything else is internal.
    pub fn from_write(err: sqlx::Error, entity: &'static str, context: &'static str) -> Self {
        let code = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
            _ => None,
        };

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => Self::AlreadyExists(entity),
            Some(FOREIGN_KEY_VIOLATION) => {
                Self::Validation(format!("{entity} references a record that does not exist"))
            }
            _ => Self::Internal(anyhow::Error::from(err).context(context)),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::TransactionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadCredentials { .. }
            | Self::MissingToken
            | Self::UnsupportedTokenType
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<SlugError> for AppError {
    fn from(err: SlugError) -> Self {
        match err {
            SlugError::Empty => Self::Validation("title must contain a letter or digit".into()),
            SlugError::Query(e) => {
                Self::Internal(anyhow::Error::from(e).context("Failed to check slug availability"))
            }
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::RoleNotFound(_) => Self::NotFound("role"),
            ResolveError::Query(e) => {
                Self::Internal(anyhow::Error::from(e).context("Failed to resolve permissions"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            Self::NotFound(entity) => tracing::debug!("Lookup of {entity} matched nothing"),
            Self::Conflict(entity) => {
                tracing::info!("Write skipped because the {entity} no longer exists")
            }
            Self::AlreadyExists(entity) => {
                tracing::info!("Rejected write that would duplicate a unique {entity} field")
            }
            Self::Validation(reason) => tracing::debug!("Rejected invalid payload: {reason}"),
            Self::TransactionFailure(reason) => {
                tracing::warn!("Transaction rolled back: {reason}")
            }
            Self::BadCredentials { username, exists } => {
                if *exists {
                    tracing::info!(
                        "User {username} attempt to login, but rejected with reason: bad password"
                    );
                } else {
                    tracing::debug!(
                        "An unknown (not existent) user try to auth with username {username}"
                    );
                }
            }
            Self::Forbidden(permission) => {
                tracing::info!("Request rejected, caller lacks permission {permission}")
            }
            Self::MissingToken | Self::UnsupportedTokenType | Self::InvalidToken => {}
            Self::Internal(e) => tracing::error!("{e:#}"),
        }

        let timestamp = chrono::Utc::now().timestamp();

        (
            self.status(),
            Json(json!({
                "error": self.to_string(),
                "timestamp": timestamp
            })),
        )
            .into_response()
    }
}

pub type Result<T> = core::result::Result<T, AppError>;
