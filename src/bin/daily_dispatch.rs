//! 单次执行每日分发管线的可执行入口，由外部调度（cron/systemd timer）触发。

use std::sync::Arc;

use stock_digest_backend::app;
use stock_digest_backend::dispatch::daily_dispatch_job;
use stock_digest_backend::services::email_client::EmailClient;
use stock_digest_backend::services::finnhub::FinnhubClient;
use stock_digest_backend::services::run_log::LocalRunLogStore;
use stock_digest_backend::utils::{config::Settings, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_logging();

    let settings = Settings::from_env();
    let db_pool = app::build_db_pool(&settings.database_url);

    let provider = Arc::new(FinnhubClient::new(&settings)?);
    let notifier = EmailClient::new(&settings);
    let sink = LocalRunLogStore::new(&settings.run_log_dir);

    let result =
        daily_dispatch_job::run_daily_dispatch_task(db_pool, provider, &notifier, &sink).await?;

    println!("Emails sent: {}", result.emails_sent);
    Ok(())
}
