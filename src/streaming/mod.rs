//! 流式测速核心模块
//!
//! 把一条上游流式连接逐步解码并归一化为统一的客户端事件协议，
//! 同时从字节流中派生时延与吞吐量指标。
//!
//! # 主要组件
//!
//! - `line_buffer`: 把任意切分的字节片段重组为完整逻辑行
//! - `error`: 会话故障分类
//! - `metrics`: 首 token 延迟 / 总耗时 / 吞吐量累积
//! - `events`: 归一化事件协议（content / done / error）
//! - `session`: 会话编排状态机

pub mod error;
pub mod events;
pub mod line_buffer;
pub mod metrics;
pub mod session;

pub use error::StreamError;
pub use events::StreamEvent;
pub use line_buffer::LineBuffer;
pub use metrics::{whole_interval_tps, MetricsSummary, SpeedMetrics};
pub use session::{open_upstream, run_session, ResultStore, SessionContext, UpstreamStream};
