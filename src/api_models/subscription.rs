use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddSubscriptionRequest {
    pub ticker: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: i32,
    pub ticker: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct DeleteSubscriptionResponse {
    pub deleted: usize,
}
