use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api_models::subscription::{
    AddSubscriptionRequest, DeleteSubscriptionResponse, SubscriptionResponse,
};
use crate::app::AppState;
use crate::handler::error::AppError;
use crate::models::NewSubscription;
use crate::repositories::subscription;
use crate::utils::auth::AuthUser;

impl From<crate::models::Subscription> for SubscriptionResponse {
    fn from(sub: crate::models::Subscription) -> Self {
        Self {
            id: sub.id,
            ticker: sub.ticker,
            created_at: sub.created_at,
        }
    }
}

/// 为当前用户新增一条订阅；ticker 统一转大写，(user, ticker) 不可重复
pub async fn create_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::InternalServerError)?;

    let ticker = payload.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::BadRequest("Ticker must not be empty.".to_string()));
    }

    let exists = subscription::exists_by_user_and_ticker(&mut conn, auth.user_id, &ticker)
        .map_err(|e| {
            tracing::error!("Failed to check subscription existence: {}", e);
            AppError::InternalServerError
        })?;

    if exists {
        return Err(AppError::BadRequest(format!(
            "Already subscribed to {}.",
            ticker
        )));
    }

    let new_sub = NewSubscription {
        user_id: auth.user_id,
        ticker,
    };

    let created = subscription::create(&mut conn, &new_sub).map_err(|e| {
        tracing::error!("Failed to create subscription: {}", e);
        AppError::InternalServerError
    })?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// 列出当前用户的全部订阅
pub async fn list_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubscriptionResponse>>, AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::InternalServerError)?;

    let subs = subscription::list_by_user(&mut conn, auth.user_id).map_err(|e| {
        tracing::error!("Failed to list subscriptions: {}", e);
        AppError::InternalServerError
    })?;

    let response: Vec<SubscriptionResponse> = subs.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// 取消当前用户对某个 ticker 的订阅
pub async fn delete_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<DeleteSubscriptionResponse>, AppError> {
    let mut conn = state.db_pool.get().map_err(|_| AppError::InternalServerError)?;

    let symbol = ticker.trim().to_uppercase();
    let deleted = subscription::delete_by_user_and_ticker(&mut conn, auth.user_id, &symbol)
        .map_err(|e| {
            tracing::error!("Failed to delete subscription: {}", e);
            AppError::InternalServerError
        })?;

    if deleted == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(DeleteSubscriptionResponse { deleted }))
}
