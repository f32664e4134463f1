//! speedcast
//!
//! LLM 流式测速服务。针对选定的大模型上游提交 prompt，
//! 逐 token 观察输出并派生时延 / 吞吐量指标。
//!
//! 核心是流式推理代理：对五个异构上游各自的线格式做增量解码，
//! 归一化为统一的客户端事件协议（content / done / error），
//! 并在任意 TCP 分片边界下保持解码正确。

pub mod config;
pub mod database;
pub mod models;
pub mod providers;
pub mod server;
pub mod streaming;

pub use config::{ApiKeys, AppConfig};
pub use database::SpeedTestDb;
pub use models::{NewSpeedTest, ProviderType, SpeedTestRequest, SpeedTestResult, SpeedTestRow};
pub use providers::{adapter_for, DecodedLine, ProviderAdapter};
pub use server::{build_router, serve, AppState};
pub use streaming::{
    run_session, ResultStore, SessionContext, SpeedMetrics, StreamError, StreamEvent,
};
