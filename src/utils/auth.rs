use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::handler::error::AppError;
use crate::utils::security;

/// 从 `Authorization: Bearer <token>` 解析出的已认证用户
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        let claims = security::decode_token(token, &state.settings.jwt_secret).map_err(|e| {
            tracing::debug!("Token decode error: {}", e);
            AppError::Unauthorized
        })?;

        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}
