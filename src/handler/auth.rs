use axum::{extract::State, http::StatusCode, Json};

use crate::api_models::auth::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::models::NewUser;
use crate::repositories::user;
use crate::utils::security;

impl From<crate::models::User> for UserResponse {
    fn from(u: crate::models::User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

/// 用户注册：邮箱唯一，密码只保存哈希
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::InternalServerError)?;

    let exists = user::exists_by_email(&mut conn, &payload.email).map_err(|e| {
        tracing::error!("Failed to check user existence: {}", e);
        AppError::InternalServerError
    })?;

    if exists {
        return Err(AppError::BadRequest(
            "Email already registered. Please Login!".to_string(),
        ));
    }

    let hashed_password = security::hash_password(&payload.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::InternalServerError
    })?;

    let new_user = NewUser {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        hashed_password,
    };

    let created = user::create(&mut conn, &new_user).map_err(|e| {
        tracing::error!("Failed to create user: {}", e);
        AppError::InternalServerError
    })?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// 用户登录：校验密码并签发短期 JWT
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::InternalServerError)?;

    let existing = user::find_by_email(&mut conn, &payload.email).map_err(|e| {
        tracing::error!("Failed to look up user: {}", e);
        AppError::InternalServerError
    })?;

    let found = existing.ok_or_else(|| {
        AppError::BadRequest("Invalid email or password. Create Account!".to_string())
    })?;

    let password_ok =
        security::verify_password(&payload.password, &found.hashed_password).map_err(|e| {
            tracing::error!("Failed to verify password: {}", e);
            AppError::InternalServerError
        })?;

    if !password_ok {
        return Err(AppError::BadRequest(
            "Invalid password. Please try again!".to_string(),
        ));
    }

    let token = security::encode_token(found.id, &state.settings.jwt_secret).map_err(|e| {
        tracing::error!("Failed to encode token: {}", e);
        AppError::InternalServerError
    })?;

    Ok(Json(TokenResponse { token }))
}
