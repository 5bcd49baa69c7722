use std::env;

use serde::Deserialize;

use forecourt_types::domain::product::DEFAULT_LOW_STOCK_THRESHOLD;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub low_stock_threshold: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let low_stock_threshold = match env::var("LOW_STOCK_THRESHOLD") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid LOW_STOCK_THRESHOLD {raw:?}: {e}"))?,
            Err(_) => DEFAULT_LOW_STOCK_THRESHOLD,
        };
        Ok(Self {
            server_port,
            database_url,
            low_stock_threshold,
        })
    }
}
