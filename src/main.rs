//! 服务入口
//!
//! 初始化日志订阅器，从环境构造配置，打开数据库并启动 HTTP 服务。

use speedcast::{serve, AppConfig, AppState, SpeedTestDb};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("speedcast=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    let db = SpeedTestDb::open(&config.database_path)?;
    let state = AppState::new(config, db);

    serve(state).await
}
