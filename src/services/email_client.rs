use crate::dispatch::aggregator::ConsolidatedData;
use crate::utils::config::Settings;

/// 每日摘要通知出口。普通传输失败在实现内部消化，只以 false 上报，绝不向上抛
pub trait StockUpdateNotifier: Send + Sync {
    fn send_stock_update(
        &self,
        recipient: &str,
        first_name: &str,
        data: &ConsolidatedData,
    ) -> bool;
}

/// 模拟邮件客户端：按正式邮件格式组装正文，但只写入日志，不做真实投递
pub struct EmailClient {
    sender_email: String,
}

impl EmailClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            sender_email: settings.email_from_address.clone(),
        }
    }

    fn format_message(&self, first_name: &str, data: &ConsolidatedData) -> String {
        let mut message = format!(
            "Hello {},\n\nHere is your financial data update for your subscribed tickers:\n\n",
            first_name
        );

        let mut tickers: Vec<&String> = data.keys().collect();
        tickers.sort();

        for ticker in tickers {
            let entry = &data[ticker];

            let (name, exchange, industry, web_url) = match &entry.profile {
                Some(p) => (
                    p.name.as_str(),
                    p.exchange.as_str(),
                    p.industry.as_str(),
                    p.web_url.as_str(),
                ),
                None => ("N/A", "N/A", "N/A", "#"),
            };
            let (current_price, high, low) = match &entry.quote {
                Some(q) => (
                    q.current_price.to_string(),
                    q.high_price.to_string(),
                    q.low_price.to_string(),
                ),
                None => ("N/A".to_string(), "N/A".to_string(), "N/A".to_string()),
            };

            message.push_str(&format!("--- {} ({}) ---\n", ticker, name));
            message.push_str(&format!("Current Price: {}\n", current_price));
            message.push_str(&format!("Daily High: {}\n", high));
            message.push_str(&format!("Daily Low: {}\n", low));
            message.push_str(&format!("Exchange: {}\n", exchange));
            message.push_str(&format!("Industry: {}\n", industry));
            message.push_str(&format!("Website: {}\n", web_url));
            message.push_str("--------------------------\n\n");
        }

        message.push_str(
            "To manage your subscriptions, please log into the app.\n\nBest regards,\nThe Financial Pipeline Team",
        );
        message
    }
}

impl StockUpdateNotifier for EmailClient {
    fn send_stock_update(
        &self,
        recipient: &str,
        first_name: &str,
        data: &ConsolidatedData,
    ) -> bool {
        let subject = "Your Daily Financial Data Update";
        let body = self.format_message(first_name, data);

        tracing::info!("{}", "=".repeat(50));
        tracing::info!("MOCK EMAIL DISPATCH");
        tracing::info!("Sending to: {}", recipient);
        tracing::info!("From: {}", self.sender_email);
        tracing::info!("Subject: {}", subject);
        tracing::info!("\n{}", body);
        tracing::info!("{}", "=".repeat(50));

        true
    }
}
