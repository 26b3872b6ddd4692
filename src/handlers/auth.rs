use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;
use validator::Validate;

use crate::{
    auth::{
        Access, ActionToken, JwtClaims, TokenPurpose, hash_password, resolve_access,
        verify_password,
    },
    error::{AppError, Result},
    models::User,
    repository::AuthRepo,
    startup::AppState,
};

#[derive(serde::Deserialize, Validate)]
pub struct RegisterModel {
    #[validate(length(min = 1, max = 255))]
    name: String,
    #[validate(length(min = 3, max = 64))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(serde::Deserialize)]
pub struct LoginModel {
    /// Username or email.
    username: String,
    password: String,
}

#[derive(serde::Deserialize)]
pub struct VerifyModel {
    token: String,
}

#[derive(serde::Deserialize, Validate)]
pub struct ForgotPasswordModel {
    #[validate(length(min = 1))]
    username: String,
}

#[derive(serde::Deserialize, Validate)]
pub struct ResetPasswordModel {
    token: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(serde::Serialize)]
pub struct AuthResponse {
    user: User,
    #[serde(flatten)]
    access: Access,
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

#[derive(serde::Serialize)]
pub struct MeResponse {
    user: User,
    #[serde(flatten)]
    access: Access,
}

#[derive(serde::Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

fn auth_response(state: &AppState, user: User, access: Access) -> Result<AuthResponse> {
    let ttl = state.auth.access_token_ttl;
    let access_token = JwtClaims::new(user.id, ttl).issue(&state.auth.jwt_secret)?;

    Ok(AuthResponse {
        user,
        access,
        access_token,
        token_type: "Bearer",
        expires_in: ttl.as_secs(),
    })
}

/// Hand an action token to the user. Mail delivery is not wired up, so the
/// token goes to the `inkpress::mail` log target.
fn deliver_action_token(state: &AppState, user: &User, purpose: TokenPurpose) -> Result<()> {
    let token = ActionToken::new(user, purpose, state.auth.action_token_ttl)
        .issue(&state.auth.jwt_secret)?;

    tracing::debug!(
        target: "inkpress::mail",
        username = %user.username,
        email = %user.email,
        ?purpose,
        %token,
        "Action token issued"
    );

    Ok(())
}

/// Load the account an action token was issued for, if the token still applies to it.
async fn redeemable_user(repo: &AuthRepo, claims: &ActionToken) -> Result<User> {
    let user = repo
        .find_by_username(&claims.username)
        .await?
        .ok_or(AppError::InvalidToken)?;
    claims.ensure_current(&user)?;

    Ok(user)
}

#[instrument(name = "register_user", skip(state, payload), fields(username = %payload.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterModel>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;
    let RegisterModel {
        name,
        username,
        email,
        password,
    } = payload;

    let hashed_password = hash_password(password).await?;

    let user = AuthRepo::new(state.db.clone())
        .register(&name, &username, &email, &hashed_password)
        .await?;

    let access = resolve_access(&state.db, &user).await?;
    deliver_action_token(&state, &user, TokenPurpose::Verify)?;

    tracing::info!("Registered user {username}");

    Ok((
        StatusCode::CREATED,
        Json(auth_response(&state, user, access)?),
    ))
}

#[instrument(name = "authorize_user", skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginModel>,
) -> Result<Json<AuthResponse>> {
    let LoginModel { username, password } = payload;

    let Some(user) = AuthRepo::new(state.db.clone())
        .find_by_login(&username)
        .await?
    else {
        return Err(AppError::BadCredentials {
            username,
            exists: false,
        });
    };

    if !verify_password(password, user.password.clone()).await? {
        return Err(AppError::BadCredentials {
            username,
            exists: true,
        });
    }

    let access = resolve_access(&state.db, &user).await?;

    Ok(Json(auth_response(&state, user, access)?))
}

#[instrument(name = "verify_user", skip(state, payload))]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyModel>,
) -> Result<Json<AuthResponse>> {
    let claims = ActionToken::redeem(&payload.token, &state.auth.jwt_secret, TokenPurpose::Verify)?;
    let repo = AuthRepo::new(state.db.clone());

    let user = redeemable_user(&repo, &claims).await?;
    let user = repo.verify(user.id).await?;
    let access = resolve_access(&state.db, &user).await?;

    tracing::info!("Verified user {}", user.username);

    Ok(Json(auth_response(&state, user, access)?))
}

#[instrument(name = "forgot_password", skip(state, payload))]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordModel>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    payload.validate()?;

    let user = AuthRepo::new(state.db.clone())
        .find_by_login(&payload.username)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    deliver_action_token(&state, &user, TokenPurpose::ResetPassword)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Password reset instructions have been sent",
        }),
    ))
}

#[instrument(name = "reset_password", skip(state, payload))]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordModel>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;
    let ResetPasswordModel { token, password } = payload;

    let claims = ActionToken::redeem(&token, &state.auth.jwt_secret, TokenPurpose::ResetPassword)?;
    let repo = AuthRepo::new(state.db.clone());

    let user = redeemable_user(&repo, &claims).await?;
    let hashed_password = hash_password(password).await?;
    let user = repo
        .change_password(user.id, &user.password, &hashed_password)
        .await?;
    let access = resolve_access(&state.db, &user).await?;

    tracing::info!("Password reset for user {}", user.username);

    Ok(Json(auth_response(&state, user, access)?))
}

#[instrument(skip(claims, state))]
pub async fn user_info(
    claims: JwtClaims,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MeResponse>> {
    let user = AuthRepo::new(state.db.clone())
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;
    let access = resolve_access(&state.db, &user).await?;

    Ok(Json(MeResponse { user, access }))
}
