use std::{sync::Arc, time::Duration};

use anyhow::Context;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::User,
    permissions::{ResolveError, resolve_permissions},
    repository::AuthRepo,
    startup::AppState,
    telemetry::spawn_blocking_with_tracing,
};

/// Claims of a bearer access token.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct JwtClaims {
    exp: usize,
    iat: usize,
    jti: Uuid,

    pub user_id: Uuid,
}

impl JwtClaims {
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now().timestamp() as usize;

        Self {
            exp: now + ttl.as_secs() as usize,
            iat: now,
            jti: Uuid::new_v4(),
            user_id,
        }
    }

    pub fn issue(&self, secret: &str) -> Result<String> {
        let encoding_key = EncodingKey::from_secret(secret.as_ref());
        let token = jsonwebtoken::encode(&Header::default(), self, &encoding_key)
            .context("Failed to issue jwt")?;

        Ok(token)
    }

    pub fn decode(token: &str, secret: &str) -> Result<Self> {
        let token_data = jsonwebtoken::decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

impl FromRequestParts<Arc<AppState>> for JwtClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> core::result::Result<Self, Self::Rejection> {
        // get the Authorization header
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::UnsupportedTokenType)?;

        Self::decode(token, &state.auth.jwt_secret)
    }
}

/// What an [`ActionToken`] may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Verify,
    ResetPassword,
}

/// Single-purpose token for email verification and password reset links.
///
/// `stamp` fingerprints the part of the account the token is meant to change,
/// so a token stops working once it has been used.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ActionToken {
    exp: usize,
    iat: usize,
    pub username: String,
    pub purpose: TokenPurpose,
    stamp: String,
}

impl ActionToken {
    pub fn new(user: &User, purpose: TokenPurpose, ttl: Duration) -> Self {
        let now = Utc::now().timestamp() as usize;

        Self {
            exp: now + ttl.as_secs() as usize,
            iat: now,
            username: user.username.clone(),
            purpose,
            stamp: account_stamp(user, purpose),
        }
    }

    pub fn issue(&self, secret: &str) -> Result<String> {
        let encoding_key = EncodingKey::from_secret(secret.as_ref());
        let token = jsonwebtoken::encode(&Header::default(), self, &encoding_key)
            .context("Failed to issue action token")?;

        Ok(token)
    }

    /// Decode `token` and check it was issued for `purpose`.
    pub fn redeem(token: &str, secret: &str, purpose: TokenPurpose) -> Result<Self> {
        let claims = jsonwebtoken::decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?
        .claims;

        if claims.purpose != purpose {
            return Err(AppError::InvalidToken);
        }

        Ok(claims)
    }

    /// Reject the token if `user` changed since it was issued.
    pub fn ensure_current(&self, user: &User) -> Result<()> {
        if user.username != self.username || account_stamp(user, self.purpose) != self.stamp {
            return Err(AppError::InvalidToken);
        }

        Ok(())
    }
}

fn account_stamp(user: &User, purpose: TokenPurpose) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.id.as_bytes());

    match purpose {
        TokenPurpose::Verify => {
            hasher.update(b"verify");
            hasher.update(user.email.as_bytes());
            let verified_at = user
                .email_verified_at
                .map(|at| at.timestamp_micros())
                .unwrap_or_default();
            hasher.update(verified_at.to_be_bytes());
        }
        TokenPurpose::ResetPassword => {
            hasher.update(b"reset_password");
            hasher.update(user.password.as_bytes());
        }
    }

    hex::encode(hasher.finalize())
}

pub async fn hash_password(password: String) -> Result<String> {
    let hashed_password = spawn_blocking_with_tracing(move || {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let argon2 = Argon2::default();

        Ok::<_, anyhow::Error>(
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {e:#}"))?
                .to_string(),
        )
    })
    .await
    // first "?": tokio JoinHandle error
    // second "?": anyhow::Error throwed inside the closure, Failed to hash password
    .context("Failed to wait hash password task quit")??;

    Ok(hashed_password)
}

/// Check `password` against a stored PHC hash. A malformed hash counts as a mismatch.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool> {
    let matches = spawn_blocking_with_tracing(move || {
        PasswordHash::new(&password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .context("Failed to wait verify password task quit")?;

    Ok(matches)
}

/// Role name and permissions attached to a user in auth responses.
#[derive(Debug, Default, serde::Serialize)]
pub struct Access {
    pub role: Option<String>,
    pub permissions: Vec<String>,
}

/// Resolve a user's access. A missing role leaves the user without one
/// instead of failing the request.
pub async fn resolve_access(db: &PgPool, user: &User) -> Result<Access> {
    match resolve_permissions(db, user.role_id).await {
        Ok(access) => Ok(Access {
            role: Some(access.role),
            permissions: access.permissions,
        }),
        Err(ResolveError::RoleNotFound(role_id)) => {
            tracing::warn!(user = %user.username, ?role_id, "User has no resolvable role");
            Ok(Access::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Load the caller and make sure their role grants `permission`.
pub async fn require_permission(
    state: &AppState,
    claims: &JwtClaims,
    permission: &'static str,
) -> Result<User> {
    let user = AuthRepo::new(state.db.clone())
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;

    match resolve_permissions(&state.db, user.role_id).await {
        Ok(access) if access.grants(permission) => Ok(user),
        Ok(_) | Err(ResolveError::RoleNotFound(_)) => Err(AppError::Forbidden(permission)),
        Err(e) => Err(e.into()),
    }
}
