//! HTTP 服务
//!
//! axum 路由与应用状态。API 面向前端：
//!
//! - `GET  /api/test/:provider/stream` — 流式测速（SSE 推送归一化事件）
//! - `POST /api/test/:provider` — 非流式测速（OpenAI / Anthropic）
//! - `GET  /api/tests` — 历史记录
//! - `POST /api/tests` — 客户端提交一条记录
//! - `GET  /api/models` — 可用模型目录

pub mod catalog;
pub mod handlers;

use crate::config::AppConfig;
use crate::database::SpeedTestDb;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// 应用共享状态
///
/// 启动时构造一次；各请求按引用读取，无全局可变状态。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// 复用的上游 HTTP 客户端（连接池）
    pub client: reqwest::Client,
    pub db: Arc<SpeedTestDb>,
}

impl AppState {
    pub fn new(config: AppConfig, db: SpeedTestDb) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
            db: Arc::new(db),
        }
    }
}

/// 构建路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/tests",
            get(handlers::list_tests).post(handlers::save_test),
        )
        .route("/api/models", get(catalog::list_models))
        .route("/api/test/:provider", post(handlers::run_test))
        .route("/api/test/:provider/stream", get(handlers::stream_test))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 绑定端口并运行服务
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let port = state.config.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "服务器已启动");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
