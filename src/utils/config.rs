use std::net::SocketAddr;

/// 进程启动时从环境读取一次的全局配置，之后以构造参数传递，业务代码不再读环境
#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: SocketAddr,
    pub database_url: String,
    pub finnhub_api_key: String,
    pub jwt_secret: String,
    pub email_from_address: String,
    pub run_log_dir: String,
}

impl Settings {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8001);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .expect("Invalid HOST/PORT");

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let finnhub_api_key =
            std::env::var("FINNHUB_API_KEY").expect("FINNHUB_API_KEY not set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY not set");
        let email_from_address = std::env::var("EMAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| "updates@stock-digest.local".to_string());
        let run_log_dir =
            std::env::var("RUN_LOG_DIR").unwrap_or_else(|_| "./run_logs".to_string());

        Self {
            addr,
            database_url,
            finnhub_api_key,
            jwt_secret,
            email_from_address,
            run_log_dir,
        }
    }
}
