use crate::dispatch::aggregator::ConsolidatedData;
use crate::models::UserWithSubscriptions;

/// 把汇总表裁剪为某个用户订阅范围内的子集。
///
/// 纯函数：只取用户订阅集与汇总表键的交集，抓取失败而缺席的 ticker
/// 静默跳过，不产生错误。
pub fn project_user_data(
    user: &UserWithSubscriptions,
    consolidated: &ConsolidatedData,
) -> ConsolidatedData {
    let mut projection = ConsolidatedData::new();

    for ticker in user.ticker_set() {
        if let Some(data) = consolidated.get(&ticker) {
            projection.insert(ticker, data.clone());
        }
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::aggregator::TickerData;
    use crate::models::{Subscription, User};

    fn make_user(id: i32, tickers: &[&str]) -> UserWithSubscriptions {
        let now = chrono::Utc::now().naive_utc();
        UserWithSubscriptions {
            user: User {
                id,
                first_name: Some("Test".to_string()),
                last_name: None,
                email: format!("user{}@test.local", id),
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

    fn consolidated_for(tickers: &[&str]) -> ConsolidatedData {
        tickers
            .iter()
            .map(|t| {
                (
                    t.to_string(),
                    TickerData {
                        quote: None,
                        profile: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_projection_is_the_intersection() {
        let user = make_user(1, &["AAPL", "GOOG", "TSLA"]);
        let consolidated = consolidated_for(&["AAPL", "GOOG", "MSFT"]);

        let projection = project_user_data(&user, &consolidated);

        assert_eq!(projection.len(), 2);
        assert!(projection.contains_key("AAPL"));
        assert!(projection.contains_key("GOOG"));
        assert!(!projection.contains_key("TSLA"));
        assert!(!projection.contains_key("MSFT"));
    }

    #[test]
    fn test_empty_intersection_yields_empty_map() {
        let user = make_user(1, &["TSLA"]);
        let consolidated = consolidated_for(&["AAPL"]);

        assert!(project_user_data(&user, &consolidated).is_empty());
    }

    #[test]
    fn test_user_without_subscriptions_yields_empty_map() {
        let user = make_user(1, &[]);
        let consolidated = consolidated_for(&["AAPL"]);

        assert!(project_user_data(&user, &consolidated).is_empty());
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let user = make_user(1, &["AAPL"]);
        let consolidated = consolidated_for(&["AAPL", "GOOG"]);

        let _ = project_user_data(&user, &consolidated);

        assert_eq!(consolidated.len(), 2);
        assert_eq!(user.subscriptions.len(), 1);
    }
}
