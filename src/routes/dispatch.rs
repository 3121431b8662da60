use axum::{routing::post, Router};

use crate::app::AppState;
use crate::handler::dispatch::trigger_daily_dispatch;

pub fn router() -> Router<AppState> {
    Router::new().route("/trigger", post(trigger_daily_dispatch))
}
