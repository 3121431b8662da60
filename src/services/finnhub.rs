use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::utils::config::Settings;

const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// 单次请求超时：挂起的上游调用在此之后按失败结算，不再拖住整批并发
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum FinnhubError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("bad status: {0}")]
    BadStatus(u16),
    #[error("quote for symbol '{0}' not found")]
    QuoteNotFound(String),
    #[error("profile for symbol '{0}' not found")]
    ProfileNotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    #[serde(rename = "c")]
    pub current_price: f64,
    #[serde(rename = "h")]
    pub high_price: f64,
    #[serde(rename = "l")]
    pub low_price: f64,
    #[serde(rename = "o")]
    pub open_price: f64,
    #[serde(rename = "pc")]
    pub previous_close: f64,
    #[serde(rename = "t")]
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub ticker: String,
    pub exchange: String,
    #[serde(rename = "finnhubIndustry")]
    pub industry: String,
    #[serde(rename = "weburl")]
    pub web_url: String,
    pub ipo: String,
    #[serde(rename = "marketCapitalization")]
    pub market_cap: f64,
    #[serde(rename = "shareOutstanding")]
    pub share_outstanding: f64,
    #[serde(rename = "logo")]
    pub logo_url: String,
    pub phone: String,
    pub country: String,
    pub currency: String,
}

/// 行情数据网关：报价与公司档案两类查询，供分发管线并发扇出调用
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, FinnhubError>;
    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, FinnhubError>;
}

pub struct FinnhubClient {
    client: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: settings.finnhub_api_key.clone(),
        })
    }

    async fn get_json(&self, path: &str, symbol: &str) -> Result<Value, FinnhubError> {
        let url = format!("{}{}", FINNHUB_BASE_URL, path);

        let mut attempt = 0;
        let max_attempts = 3;
        loop {
            attempt += 1;
            let resp = self
                .client
                .get(&url)
                .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
                .send()
                .await;

            match resp {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await?;
                    if !status.is_success() {
                        let retryable = matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504);
                        if retryable && attempt < max_attempts {
                            let backoff = 200_u64.saturating_mul(attempt as u64);
                            let jitter = rand::thread_rng().gen_range(0..=150);
                            tracing::warn!(
                                "Finnhub 接口返回非成功状态，准备重试: status={}, symbol={}, attempt={}",
                                status,
                                symbol,
                                attempt
                            );
                            sleep(Duration::from_millis(backoff + jitter)).await;
                            continue;
                        }
                        return Err(FinnhubError::BadStatus(status.as_u16()));
                    }
                    return Ok(serde_json::from_str(&body)?);
                }
                Err(e) => {
                    if attempt < max_attempts {
                        let backoff = 200_u64.saturating_mul(attempt as u64);
                        let jitter = rand::thread_rng().gen_range(0..=150);
                        tracing::warn!(
                            "Finnhub 接口请求失败，准备重试: error={}, symbol={}, attempt={}",
                            e,
                            symbol,
                            attempt
                        );
                        sleep(Duration::from_millis(backoff + jitter)).await;
                        continue;
                    }
                    return Err(FinnhubError::Http(e));
                }
            }
        }
    }
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, FinnhubError> {
        let symbol = symbol.trim().to_uppercase();
        let json = self.get_json("/quote", &symbol).await?;
        parse_quote(&symbol, json)
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, FinnhubError> {
        let symbol = symbol.trim().to_uppercase();
        let json = self.get_json("/stock/profile2", &symbol).await?;
        parse_profile(&symbol, json)
    }
}

/// 现价为 0 是 Finnhub 对未知代码的哨兵值
pub fn parse_quote(symbol: &str, json: Value) -> Result<StockQuote, FinnhubError> {
    let current = json.get("c").and_then(|v| v.as_f64()).unwrap_or(0.0);
    if current == 0.0 {
        return Err(FinnhubError::QuoteNotFound(symbol.to_string()));
    }
    Ok(serde_json::from_value(json)?)
}

/// 未知代码的档案响应是空对象或缺失 name 字段
pub fn parse_profile(symbol: &str, json: Value) -> Result<CompanyProfile, FinnhubError> {
    match json.get("name").and_then(|v| v.as_str()) {
        Some(name) if !name.is_empty() => {}
        _ => return Err(FinnhubError::ProfileNotFound(symbol.to_string())),
    }
    Ok(serde_json::from_value(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote_json() -> Value {
        json!({
            "c": 172.5, "h": 175.0, "l": 171.2, "o": 173.0,
            "pc": 170.9, "t": 1704067200, "d": 1.6, "dp": 0.94
        })
    }

    fn profile_json() -> Value {
        json!({
            "name": "Apple Inc", "ticker": "AAPL", "exchange": "NASDAQ NMS - GLOBAL MARKET",
            "finnhubIndustry": "Technology", "weburl": "https://www.apple.com/",
            "ipo": "1980-12-12", "marketCapitalization": 2840000.0,
            "shareOutstanding": 15441.88, "logo": "https://static.finnhub.io/logo/aapl.png",
            "phone": "14089961010", "country": "US", "currency": "USD"
        })
    }

    #[test]
    fn test_parse_quote_valid() {
        let quote = parse_quote("AAPL", quote_json()).unwrap();
        assert_eq!(quote.current_price, 172.5);
        assert_eq!(quote.previous_close, 170.9);
        assert_eq!(quote.timestamp, 1704067200);
    }

    #[test]
    fn test_parse_quote_zero_price_is_not_found() {
        let json = json!({"c": 0.0, "h": 0.0, "l": 0.0, "o": 0.0, "pc": 0.0, "t": 0});
        let err = parse_quote("NOPE", json).unwrap_err();
        assert!(matches!(err, FinnhubError::QuoteNotFound(s) if s == "NOPE"));
    }

    #[test]
    fn test_parse_quote_missing_field_is_upstream_failure() {
        // current price present but schema incomplete: validation failure, not NotFound
        let json = json!({"c": 12.3});
        let err = parse_quote("AAPL", json).unwrap_err();
        assert!(matches!(err, FinnhubError::SerdeJson(_)));
    }

    #[test]
    fn test_parse_profile_valid_maps_fields() {
        let profile = parse_profile("AAPL", profile_json()).unwrap();
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.industry, "Technology");
        assert_eq!(profile.web_url, "https://www.apple.com/");
        assert_eq!(profile.share_outstanding, 15441.88);
    }

    #[test]
    fn test_parse_profile_missing_name_is_not_found() {
        let err = parse_profile("NOPE", json!({})).unwrap_err();
        assert!(matches!(err, FinnhubError::ProfileNotFound(s) if s == "NOPE"));
    }

    #[test]
    fn test_parse_profile_empty_name_is_not_found() {
        let mut json = profile_json();
        json["name"] = json!("");
        let err = parse_profile("AAPL", json).unwrap_err();
        assert!(matches!(err, FinnhubError::ProfileNotFound(_)));
    }
}
