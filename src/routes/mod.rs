use axum::Router;

use crate::app::AppState;

mod auth;
mod dispatch;
mod root;
mod subscription;

pub fn build_routes() -> Router<AppState> {
    Router::new()
        // 根路径与健康检查
        .merge(root::router())
        .nest("/auth", auth::router())
        .nest("/subscriptions", subscription::router())
        .nest("/dispatch", dispatch::router())
}
