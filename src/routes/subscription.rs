use axum::{
    routing::{delete, post},
    Router,
};

use crate::app::AppState;
use crate::handler::subscription::{create_subscription, delete_subscription, list_subscriptions};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subscription).get(list_subscriptions))
        .route("/:ticker", delete(delete_subscription))
}
