use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TriggerDispatchResponse {
    pub success: bool,
    pub message: String,
    pub emails_sent: usize,
    pub total_users: usize,
    pub skipped_users: usize,
    pub failed_users: usize,
    pub tickers_processed: Vec<String>,
    pub status: String,
}
