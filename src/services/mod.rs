pub mod email_client;
pub mod finnhub;
pub mod run_log;
