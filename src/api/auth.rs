use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{validate_password_len, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{
    MessageResponse, PasswordResetConfirm, PasswordResetRequest, TokenResponse,
};
use crate::schemas::user::{UserCreate, UserLogin, UserResponse};
use crate::services::reset_tokens;

/// Max attempts per window for auth endpoints (login/signup/token/reset).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/token", post(token))
        .route("/me", get(me))
        .route("/password-reset/request", post(password_reset_request))
        .route("/password-reset/confirm", post(password_reset_confirm))
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_username(&payload.username)?;
    validate_password_len(&payload.password)?;

    let rate_key = format!("rl:signup:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many signup attempts, try again later"));
    }

    let existing = repositories::users::exists_by_username_or_email(
        state.db(),
        &payload.username,
        &payload.email,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict(
            "User with this username or email already exists".to_string(),
        ));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            email: &payload.email,
            hashed_password,
            full_name: &payload.full_name,
            role: UserRole::Student,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let response = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rate_key = format!("rl:login:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = fetch_user_by_username(&state, &payload.username).await?;
    issue_token(&state, user, &payload.password)
}

async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rate_key = format!("rl:token:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many token attempts, try again later"));
    }

    let user = fetch_user_by_username(&state, &payload.username).await?;
    issue_token(&state, user, &payload.password)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

/// Always answers 200 so the endpoint cannot be used to probe which emails
/// are registered. The reset link itself rides the outbox.
async fn password_reset_request(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let rate_key = format!("rl:pwreset:{}", payload.email.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many reset attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    if let Some(user) = user {
        if user.is_active {
            enqueue_reset(&state, &user).await?;
        }
    }

    Ok(Json(MessageResponse {
        detail: "If the account exists, a reset link has been sent".to_string(),
    }))
}

async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password_len(&payload.new_password)?;

    let now = primitive_now_utc();
    let token_hash = reset_tokens::hash_reset_token(&payload.token);

    let record = repositories::password_resets::find_valid_by_hash(state.db(), &token_hash, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up reset token"))?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".to_string()))?;

    let hashed_password = security::hash_password(&payload.new_password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::users::set_password(&mut *tx, &record.user_id, &hashed_password, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update password"))?;

    repositories::password_resets::mark_used(&mut *tx, &record.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to consume reset token"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(user_id = %record.user_id, "Password reset completed");

    Ok(Json(MessageResponse { detail: "Password has been reset".to_string() }))
}

/// Writes the reset token and its notification in one transaction, so a
/// stored token always has a pending delivery and vice versa.
async fn enqueue_reset(state: &AppState, user: &User) -> Result<(), ApiError> {
    let settings = state.settings();
    let now = primitive_now_utc();
    let ttl = Duration::minutes(settings.security().reset_token_ttl_minutes as i64);

    let raw_token = reset_tokens::generate_reset_token();
    let token_hash = reset_tokens::hash_reset_token(&raw_token);
    let reset_url = format!("{}?token={raw_token}", settings.notify().reset_url_base);

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::password_resets::create(
        &mut *tx,
        repositories::password_resets::CreateResetToken {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            token_hash: &token_hash,
            expires_at: now + ttl,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store reset token"))?;

    repositories::outbox::create(
        &mut *tx,
        repositories::outbox::CreateMessage {
            id: &Uuid::new_v4().to_string(),
            kind: "password_reset",
            payload: serde_json::json!({
                "user_id": user.id,
                "email": user.email,
                "reset_url": reset_url,
            }),
            next_attempt_at: now,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to enqueue reset notification"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("password_reset_requests_total").increment(1);

    Ok(())
}

fn issue_token(
    state: &AppState,
    user: User,
    password: &str,
) -> Result<Json<TokenResponse>, ApiError> {
    let verified = security::verify_password(password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn fetch_user_by_username(state: &AppState, username: &str) -> Result<User, ApiError> {
    repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))
}
