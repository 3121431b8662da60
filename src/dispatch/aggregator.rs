use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::services::finnhub::{CompanyProfile, QuoteProvider, StockQuote};

/// 同一并发批次内允许的最大在途请求数
const FETCH_CONCURRENCY: usize = 8;

/// 单个 ticker 的抓取结果：任一半失败即记为缺失，不影响另一半
#[derive(Debug, Clone)]
pub struct TickerData {
    pub quote: Option<StockQuote>,
    pub profile: Option<CompanyProfile>,
}

pub type ConsolidatedData = HashMap<String, TickerData>;

/// 对去重后的 ticker 集合并发抓取报价与档案，合并为一张汇总表。
///
/// 每个 ticker 一个任务，任务内报价与档案两路并发；所有分支各自结算，
/// 单个失败不会取消或阻塞其余分支。两半都失败的 ticker 不进入汇总表。
pub async fn aggregate(
    provider: Arc<dyn QuoteProvider>,
    tickers: &HashSet<String>,
) -> ConsolidatedData {
    if tickers.is_empty() {
        tracing::info!("没有待抓取的 ticker，跳过行情聚合");
        return ConsolidatedData::new();
    }

    let semaphore = Arc::new(Semaphore::new(FETCH_CONCURRENCY));
    let mut handles = Vec::with_capacity(tickers.len());

    for ticker in tickers {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let provider = provider.clone();
        let ticker = ticker.clone();
        let h = tokio::spawn(async move {
            let _p = permit;
            let (quote, profile) = tokio::join!(
                provider.fetch_quote(&ticker),
                provider.fetch_profile(&ticker)
            );

            let quote = match quote {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::warn!("ticker {} 报价抓取失败: {}", ticker, e);
                    None
                }
            };
            let profile = match profile {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("ticker {} 档案抓取失败: {}", ticker, e);
                    None
                }
            };

            if quote.is_none() && profile.is_none() {
                tracing::error!("ticker {} 两路抓取均失败，本轮不进入汇总表", ticker);
                return None;
            }
            Some((ticker, TickerData { quote, profile }))
        });
        handles.push(h);
    }

    let mut consolidated = ConsolidatedData::new();
    for h in handles {
        if let Ok(Some((ticker, data))) = h.await {
            consolidated.insert(ticker, data);
        }
    }

    tracing::info!("行情聚合完成，汇总表包含 {} 个 ticker", consolidated.len());
    consolidated
}
