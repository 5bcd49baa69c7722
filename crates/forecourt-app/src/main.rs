use forecourt_core::application::Console;
use forecourt_core::config::Config;
use forecourt_core::inbound::http::{HttpServer, HttpServerConfig};
use forecourt_gateway::{build_gateway, Gateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let gateway: Gateway = build_gateway(config.database_url.as_deref()).await?;
    let console = Console::new(gateway, config.low_stock_threshold);

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(console, server_cfg).await?;
    http.run().await
}
