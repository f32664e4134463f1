//! 测速会话
//!
//! 端到端编排一次流式测速请求：驱动上游字节流经过行重组、逐行解码
//! 与指标累积，把归一化事件下发给客户端传输层，并在成功结束时把
//! 结果记录异步交给持久层。
//!
//! 每个请求由恰好一个异步任务独占驱动，会话状态不跨请求共享；
//! 事件流被丢弃（客户端断开）时上游连接随之关闭，不留后台工作。

use crate::models::{ProviderType, SpeedTestResult};
use crate::providers::{DecodedLine, ProviderAdapter};
use crate::streaming::error::{truncate_message, StreamError};
use crate::streaming::events::StreamEvent;
use crate::streaming::line_buffer::LineBuffer;
use crate::streaming::metrics::SpeedMetrics;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 上游字节流
///
/// 每个 Item 是一个无帧边界保证的原始字节片段。
pub type UpstreamStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// 结果记录的持久化接口
///
/// 会话在 `done` 事件之后 fire-and-forget 地调用；实现方必须容忍
/// 来自独立会话的并发写入并自行串行化。
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn record(&self, result: &SpeedTestResult) -> Result<(), StreamError>;
}

/// 单次会话的不可变上下文
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// 会话标识，仅用于日志关联
    pub session_id: String,
    pub provider: ProviderType,
    /// 规范化后的模型名
    pub model: String,
    /// prompt 的字符数（用于 token 估算）
    pub prompt_chars: usize,
}

impl SessionContext {
    pub fn new(provider: ProviderType, model: String, prompt: &str) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            provider,
            model,
            prompt_chars: prompt.chars().count(),
        }
    }
}

/// 发起上游流式调用
///
/// 连接失败或上游返回非 2xx 都在这里折叠为 `StreamError`，
/// 调用方把它作为唯一的 `error` 事件下发。
pub async fn open_upstream(
    client: &reqwest::Client,
    adapter: &dyn ProviderAdapter,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<UpstreamStream, StreamError> {
    let response = adapter
        .build_request(client, api_key, model, prompt, true)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::upstream(
            status.as_u16(),
            truncate_message(&body, 300),
        ));
    }

    Ok(Box::pin(
        response.bytes_stream().map(|r| r.map_err(StreamError::from)),
    ))
}

/// 驱动一次会话，产出归一化事件流
///
/// 事件顺序保证：`content` 事件严格按解码顺序，终止事件
/// （`done` 或 `error`，二者互斥）恰好一条且总在最后。
/// 上游中途出错时已累积的部分响应被丢弃，不产出结果记录。
pub fn run_session(
    context: SessionContext,
    upstream: UpstreamStream,
    adapter: &'static dyn ProviderAdapter,
    store: Option<Arc<dyn ResultStore>>,
) -> impl Stream<Item = StreamEvent> + Send {
    async_stream::stream! {
        let mut metrics = SpeedMetrics::start_now();
        let mut buffer = LineBuffer::new();
        let mut response_text = String::new();
        let mut upstream = upstream;

        info!(
            session_id = %context.session_id,
            provider = %context.provider,
            model = %context.model,
            "开始流式测速会话"
        );

        loop {
            match upstream.next().await {
                Some(Ok(chunk)) => {
                    for line in buffer.push(&chunk) {
                        match adapter.decode_line(&line) {
                            DecodedLine::Content(text) if !text.is_empty() => {
                                response_text.push_str(&text);
                                metrics.record_fragment(&text);
                                yield StreamEvent::content(text);
                            }
                            // 空片段不计入指标也不下发
                            DecodedLine::Content(_) => {}
                            DecodedLine::StreamEnd => {
                                debug!(session_id = %context.session_id, "收到数据结束哨兵");
                            }
                            DecodedLine::Ignored => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        session_id = %context.session_id,
                        provider = %context.provider,
                        error = %e,
                        "上游流读取失败，终止会话"
                    );
                    yield StreamEvent::error(&e);
                    return;
                }
                None => break,
            }
        }

        if buffer.pending_len() > 0 {
            // 上游关闭时的半行不是合法记录，丢弃
            debug!(
                session_id = %context.session_id,
                pending = buffer.pending_len(),
                "丢弃未终止的残留行"
            );
        }

        let summary = metrics.finalize();
        let result = SpeedTestResult {
            model: context.model.clone(),
            response: response_text,
            prompt_length: SpeedMetrics::estimate_tokens(context.prompt_chars),
            response_length: summary.response_tokens,
            time_taken_ms: summary.time_taken_ms,
            tokens_per_second: summary.tokens_per_second,
            provider: adapter.name().to_string(),
        };

        info!(
            session_id = %context.session_id,
            time_taken_ms = summary.time_taken_ms,
            ttft_ms = summary.time_to_first_token_ms,
            tokens_per_second = summary.tokens_per_second,
            "会话完成"
        );

        // 持久化失败不影响已经下发的 done 事件
        if let Some(store) = store {
            let record = result.clone();
            let session_id = context.session_id.clone();
            tokio::spawn(async move {
                if let Err(e) = store.record(&record).await {
                    warn!(session_id = %session_id, error = %e, "测试记录写入失败");
                }
            });
        }

        yield StreamEvent::done(result);
    }
}
