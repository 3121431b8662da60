use axum::{routing::post, Router};

use crate::app::AppState;
use crate::handler::auth::{login, register};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
