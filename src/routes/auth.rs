//! Authentication routes
//!
//! Local accounts: argon2 password hashes, HS256 access tokens.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::{hash_password, verify_password};
use crate::domain::auth::{
    normalize_email, AuthResponse, LoginRequest, RegisterRequest, User, UserRole,
};
use crate::error::ApiError;
use crate::store::{retry_once, StoreError, UserStore};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// POST /auth/register
///
/// Create an account and return an access token for it.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.validate().map_err(ApiError::validation)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let role = if state.settings.is_admin_email(&email) {
        UserRole::Admin
    } else {
        UserRole::Bidder
    };

    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash,
        role,
        created_at: Utc::now(),
    };

    let user_id = user.id;
    let inserted = retry_once("insert_user", || state.store.insert_user(user.clone())).await;
    let user = match inserted {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            // A retried insert may collide with its own first attempt.
            retry_once("find_user_by_email", || state.store.find_user_by_email(&user.email))
                .await?
                .filter(|existing| existing.id == user_id)
                .ok_or_else(|| ApiError::Conflict("Email already registered".to_string()))?
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok(Created(DataResponse::new(auth_response(&state, user)?)))
}

/// POST /auth/login
///
/// Exchange credentials for an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);

    let user = retry_once("find_user_by_email", || state.store.find_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::internal(format!("Password verification task failed: {e}")))?
        .map_err(|e| ApiError::internal(e.to_string()))?;

    if !valid {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(DataResponse::new(auth_response(&state, user)?)))
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let (access_token, expires_in) = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(AuthResponse {
        access_token,
        token_type: "Bearer",
        expires_in,
        user: user.into(),
    })
}
