use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::DbPool;
use crate::dispatch::aggregator::aggregate;
use crate::dispatch::projector::project_user_data;
use crate::models::UserWithSubscriptions;
use crate::repositories::{subscription, user};
use crate::services::email_client::StockUpdateNotifier;
use crate::services::finnhub::QuoteProvider;
use crate::services::run_log::{RunLogSink, RUN_LOG_WRITE_FAILED};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_NO_DATA_FETCHED: &str = "no_data_fetched";

/// 每轮分发落盘一条的运行摘要
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub date: String,
    pub timestamp_utc_start: String,
    pub timestamp_utc_end: String,
    pub emails_sent: usize,
    pub tickers_processed: Vec<String>,
    pub status: String,
}

#[derive(Debug)]
pub struct DispatchRunResult {
    pub emails_sent: usize,
    pub total_users: usize,
    pub skipped_users: usize,
    pub failed_users: usize,
    pub tickers_processed: Vec<String>,
    pub status: String,
}

/// 执行一轮每日分发（可被手动触发接口或 daily_dispatch 可执行文件调用）。
///
/// 只有台账枚举失败会让整轮失败；其余所有失败都在各自最小范围内消化。
pub async fn run_daily_dispatch_task(
    db_pool: DbPool,
    provider: Arc<dyn QuoteProvider>,
    notifier: &dyn StockUpdateNotifier,
    sink: &dyn RunLogSink,
) -> anyhow::Result<DispatchRunResult> {
    // 台账读取集中在扇出之前完成，抓取分支不接触数据库
    let mut conn = db_pool.get()?;
    let tickers = subscription::list_all_unique_tickers(&mut conn)?;
    let users = if tickers.is_empty() {
        Vec::new()
    } else {
        user::list_for_dispatch(&mut conn)?
    };
    drop(conn);

    Ok(dispatch_updates(provider, notifier, sink, tickers, users).await)
}

/// 分发主流程：聚合、逐用户裁剪并发送、落盘运行摘要。
/// 无论从哪条路径退出，运行摘要恰好写一次。
pub async fn dispatch_updates(
    provider: Arc<dyn QuoteProvider>,
    notifier: &dyn StockUpdateNotifier,
    sink: &dyn RunLogSink,
    tickers: HashSet<String>,
    users: Vec<UserWithSubscriptions>,
) -> DispatchRunResult {
    tracing::info!("开始执行每日行情邮件分发任务");
    let started_at = Utc::now();

    let mut tickers_processed: Vec<String> = tickers.iter().cloned().collect();
    tickers_processed.sort();

    let consolidated = aggregate(provider, &tickers).await;

    if consolidated.is_empty() {
        tracing::info!("本轮没有可用的行情数据，跳过发送");
        write_run_summary(sink, started_at, 0, &tickers_processed, STATUS_NO_DATA_FETCHED);
        return DispatchRunResult {
            emails_sent: 0,
            total_users: users.len(),
            skipped_users: 0,
            failed_users: 0,
            tickers_processed,
            status: STATUS_NO_DATA_FETCHED.to_string(),
        };
    }

    if users.is_empty() {
        tracing::info!("没有持有订阅的用户，跳过发送");
        write_run_summary(sink, started_at, 0, &tickers_processed, STATUS_NO_DATA_FETCHED);
        return DispatchRunResult {
            emails_sent: 0,
            total_users: 0,
            skipped_users: 0,
            failed_users: 0,
            tickers_processed,
            status: STATUS_NO_DATA_FETCHED.to_string(),
        };
    }

    tracing::info!("共 {} 个用户待发送", users.len());

    let mut emails_sent = 0;
    let mut skipped_users = 0;
    let mut failed_users = 0;

    for entry in &users {
        let projection = project_user_data(entry, &consolidated);

        if projection.is_empty() {
            skipped_users += 1;
            tracing::warn!(
                "用户 {} 订阅的 ticker 本轮均无数据，跳过发送",
                entry.user.email
            );
            continue;
        }

        let first_name = entry.user.first_name.as_deref().unwrap_or("Valued Customer");
        if notifier.send_stock_update(&entry.user.email, first_name, &projection) {
            emails_sent += 1;
            tracing::debug!("用户 {} 邮件发送成功", entry.user.email);
        } else {
            failed_users += 1;
            tracing::error!("Failed to dispatch email to user: {}", entry.user.email);
        }
    }

    tracing::info!(
        "每日邮件分发完成，总计: {}, 发送: {}, 跳过: {}, 失败: {}",
        users.len(),
        emails_sent,
        skipped_users,
        failed_users
    );

    write_run_summary(sink, started_at, emails_sent, &tickers_processed, STATUS_SUCCESS);

    DispatchRunResult {
        emails_sent,
        total_users: users.len(),
        skipped_users,
        failed_users,
        tickers_processed,
        status: STATUS_SUCCESS.to_string(),
    }
}

/// 组装运行摘要并写入 sink。写入失败只记日志，不影响本轮返回值
fn write_run_summary(
    sink: &dyn RunLogSink,
    started_at: DateTime<Utc>,
    emails_sent: usize,
    tickers_processed: &[String],
    status: &str,
) {
    let ended_at = Utc::now();
    let date = started_at.format("%Y-%m-%d").to_string();

    let summary = RunSummary {
        date: date.clone(),
        timestamp_utc_start: started_at.to_rfc3339(),
        timestamp_utc_end: ended_at.to_rfc3339(),
        emails_sent,
        tickers_processed: tickers_processed.to_vec(),
        status: status.to_string(),
    };

    let key = format!("daily_logs/{}.json", date);
    match serde_json::to_vec_pretty(&summary) {
        Ok(bytes) => {
            let location = sink.write(&key, &bytes);
            if location.starts_with(RUN_LOG_WRITE_FAILED) {
                tracing::error!("运行摘要写入失败: {}", location);
            } else {
                tracing::info!("运行摘要已写入: {}", location);
            }
        }
        Err(e) => {
            tracing::error!("运行摘要序列化失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::dispatch::aggregator::ConsolidatedData;
    use crate::models::{Subscription, User};
    use crate::services::finnhub::{CompanyProfile, FinnhubError, StockQuote};

    struct FakeProvider {
        failing_quotes: HashSet<String>,
        failing_profiles: HashSet<String>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                failing_quotes: HashSet::new(),
                failing_profiles: HashSet::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        async fn fetch_quote(&self, symbol: &str) -> Result<StockQuote, FinnhubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_quotes.contains(symbol) {
                return Err(FinnhubError::BadStatus(502));
            }
            Ok(StockQuote {
                current_price: 100.0,
                high_price: 110.0,
                low_price: 90.0,
                open_price: 95.0,
                previous_close: 99.0,
                timestamp: 1704067200,
            })
        }

        async fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile, FinnhubError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_profiles.contains(symbol) {
                return Err(FinnhubError::ProfileNotFound(symbol.to_string()));
            }
            Ok(CompanyProfile {
                name: format!("{} Inc", symbol),
                ticker: symbol.to_string(),
                exchange: "NASDAQ".to_string(),
                industry: "Technology".to_string(),
                web_url: "https://example.com/".to_string(),
                ipo: "2000-01-01".to_string(),
                market_cap: 1000.0,
                share_outstanding: 100.0,
                logo_url: String::new(),
                phone: String::new(),
                country: "US".to_string(),
                currency: "USD".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail_for: HashSet<String>,
        sent: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl StockUpdateNotifier for RecordingNotifier {
        fn send_stock_update(
            &self,
            recipient: &str,
            _first_name: &str,
            data: &ConsolidatedData,
        ) -> bool {
            let mut tickers: Vec<String> = data.keys().cloned().collect();
            tickers.sort();
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), tickers));
            !self.fail_for.contains(recipient)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl RunLogSink for RecordingSink {
        fn write(&self, key: &str, data: &[u8]) -> String {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), data.to_vec()));
            format!("mem://{}", key)
        }
    }

    fn make_user(id: i32, email: &str, tickers: &[&str]) -> UserWithSubscriptions {
        let now = chrono::Utc::now().naive_utc();
        UserWithSubscriptions {
            user: User {
                id,
                first_name: Some(format!("User{}", id)),
                last_name: None,
                email: email.to_string(),
                hashed_password: "hash".to_string(),
                created_at: now,
            },
            subscriptions: tickers
                .iter()
                .enumerate()
                .map(|(i, t)| Subscription {
                    id: id * 100 + i as i32,
                    user_id: id,
                    ticker: t.to_string(),
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
        }
    }

    fn ticker_set(symbols: &[&str]) -> HashSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn parse_summary(sink: &RecordingSink) -> RunSummary {
        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1, "exactly one run summary per invocation");
        serde_json::from_slice(&writes[0].1).unwrap()
    }

    #[tokio::test]
    async fn test_partial_failure_scenario_two_users() {
        // AAPL succeeds fully, GOOG quote fails; U1 holds AAPL, U2 holds both
        let mut provider = FakeProvider::new();
        provider.failing_quotes.insert("GOOG".to_string());
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();

        let users = vec![
            make_user(1, "u1@test.local", &["AAPL"]),
            make_user(2, "u2@test.local", &["AAPL", "GOOG"]),
        ];

        let result = dispatch_updates(
            Arc::new(provider),
            &notifier,
            &sink,
            ticker_set(&["AAPL", "GOOG"]),
            users,
        )
        .await;

        assert_eq!(result.emails_sent, 2);
        assert_eq!(result.status, STATUS_SUCCESS);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        let u1 = sent.iter().find(|(r, _)| r == "u1@test.local").unwrap();
        assert_eq!(u1.1, vec!["AAPL"]);
        let u2 = sent.iter().find(|(r, _)| r == "u2@test.local").unwrap();
        assert_eq!(u2.1, vec!["AAPL", "GOOG"]);
        drop(sent);

        let summary = parse_summary(&sink);
        assert_eq!(summary.emails_sent, 2);
        assert_eq!(summary.tickers_processed, vec!["AAPL", "GOOG"]);
        assert_eq!(summary.status, STATUS_SUCCESS);
    }

    #[tokio::test]
    async fn test_no_subscriptions_at_all() {
        let provider = Arc::new(FakeProvider::new());
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();

        let result = dispatch_updates(
            provider.clone(),
            &notifier,
            &sink,
            HashSet::new(),
            Vec::new(),
        )
        .await;

        assert_eq!(result.emails_sent, 0);
        assert_eq!(result.status, STATUS_NO_DATA_FETCHED);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(notifier.sent.lock().unwrap().is_empty());

        let summary = parse_summary(&sink);
        assert_eq!(summary.status, STATUS_NO_DATA_FETCHED);
        assert!(summary.tickers_processed.is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_abort_remaining_users() {
        let provider = FakeProvider::new();
        let mut notifier = RecordingNotifier::default();
        notifier.fail_for.insert("u2@test.local".to_string());
        let sink = RecordingSink::default();

        let users = vec![
            make_user(1, "u1@test.local", &["AAPL"]),
            make_user(2, "u2@test.local", &["AAPL"]),
            make_user(3, "u3@test.local", &["AAPL"]),
        ];

        let result = dispatch_updates(
            Arc::new(provider),
            &notifier,
            &sink,
            ticker_set(&["AAPL"]),
            users,
        )
        .await;

        assert_eq!(result.emails_sent, 2);
        assert_eq!(result.failed_users, 1);
        // all three projections were computed and attempted
        assert_eq!(notifier.sent.lock().unwrap().len(), 3);
        assert_eq!(parse_summary(&sink).emails_sent, 2);
    }

    #[tokio::test]
    async fn test_empty_projection_skips_user_without_notifying() {
        // TSLA fails on both halves, so its only subscriber has nothing to receive
        let mut provider = FakeProvider::new();
        provider.failing_quotes.insert("TSLA".to_string());
        provider.failing_profiles.insert("TSLA".to_string());
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();

        let users = vec![
            make_user(1, "u1@test.local", &["AAPL"]),
            make_user(2, "u2@test.local", &["TSLA"]),
        ];

        let result = dispatch_updates(
            Arc::new(provider),
            &notifier,
            &sink,
            ticker_set(&["AAPL", "TSLA"]),
            users,
        )
        .await;

        assert_eq!(result.emails_sent, 1);
        assert_eq!(result.skipped_users, 1);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "u1@test.local");
    }

    #[tokio::test]
    async fn test_all_fetches_failed_writes_no_data_summary() {
        let mut provider = FakeProvider::new();
        provider.failing_quotes.insert("AAPL".to_string());
        provider.failing_profiles.insert("AAPL".to_string());
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();

        let users = vec![make_user(1, "u1@test.local", &["AAPL"])];

        let result = dispatch_updates(
            Arc::new(provider),
            &notifier,
            &sink,
            ticker_set(&["AAPL"]),
            users,
        )
        .await;

        assert_eq!(result.emails_sent, 0);
        assert_eq!(result.status, STATUS_NO_DATA_FETCHED);
        assert!(notifier.sent.lock().unwrap().is_empty());

        let summary = parse_summary(&sink);
        assert_eq!(summary.status, STATUS_NO_DATA_FETCHED);
        assert_eq!(summary.tickers_processed, vec!["AAPL"]);
    }

    #[tokio::test]
    async fn test_summary_key_uses_run_date() {
        let provider = Arc::new(FakeProvider::new());
        let notifier = RecordingNotifier::default();
        let sink = RecordingSink::default();

        dispatch_updates(provider, &notifier, &sink, HashSet::new(), Vec::new()).await;

        let writes = sink.writes.lock().unwrap();
        let key = &writes[0].0;
        assert!(key.starts_with("daily_logs/"));
        assert!(key.ends_with(".json"));
    }
}
