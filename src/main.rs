use std::net::SocketAddr;
use std::sync::Arc;

use stock_digest_backend::{app, utils};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    utils::logging::init_logging();

    let settings = Arc::new(utils::config::Settings::from_env());
    let addr: SocketAddr = settings.addr;

    let db_pool = app::build_db_pool(&settings.database_url);
    let app = app::build_app_with_pool(db_pool, settings);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind failed");
    tracing::info!(
        "Axum listening on http://{}",
        listener.local_addr().unwrap()
    );
    axum::serve(listener, app).await.expect("server failed");
}
