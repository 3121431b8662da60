use std::sync::Arc;

use axum::{extract::State, Json};

use crate::api_models::dispatch::TriggerDispatchResponse;
use crate::app::AppState;
use crate::dispatch::daily_dispatch_job;
use crate::handler::error::AppError;
use crate::services::email_client::EmailClient;
use crate::services::finnhub::FinnhubClient;
use crate::services::run_log::LocalRunLogStore;

/// 手动触发一轮每日分发（正常情况下由外部调度调用 daily_dispatch 可执行文件）
pub async fn trigger_daily_dispatch(
    State(state): State<AppState>,
) -> Result<Json<TriggerDispatchResponse>, AppError> {
    tracing::info!("收到手动触发每日分发任务的请求");

    let provider = Arc::new(FinnhubClient::new(&state.settings).map_err(|e| {
        tracing::error!("Failed to build finnhub client: {}", e);
        AppError::InternalServerError
    })?);
    let notifier = EmailClient::new(&state.settings);
    let sink = LocalRunLogStore::new(&state.settings.run_log_dir);

    match daily_dispatch_job::run_daily_dispatch_task(
        state.db_pool.clone(),
        provider,
        &notifier,
        &sink,
    )
    .await
    {
        Ok(result) => {
            let message = format!(
                "每日分发任务执行完成，总计 {} 个用户，发送 {} 封，跳过 {} 个，失败 {} 个",
                result.total_users, result.emails_sent, result.skipped_users, result.failed_users
            );
            Ok(Json(TriggerDispatchResponse {
                success: result.failed_users == 0,
                message,
                emails_sent: result.emails_sent,
                total_users: result.total_users,
                skipped_users: result.skipped_users,
                failed_users: result.failed_users,
                tickers_processed: result.tickers_processed,
                status: result.status,
            }))
        }
        Err(e) => {
            tracing::error!("手动触发每日分发任务失败: {}", e);
            Err(AppError::InternalServerError)
        }
    }
}
