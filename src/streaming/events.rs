//! 归一化事件协议
//!
//! 会话与客户端传输层之间的稳定契约。五个上游各有一套线格式，
//! 经解码后统一折叠为三种事件：
//!
//! - `{"type":"content","content":"..."}` — 零或多条，按解码顺序
//! - `{"type":"done","result":{...}}` — 成功时恰好一条，终止事件
//! - `{"type":"error","error":"...","category":"..."}` — 失败时恰好一条，
//!   与 `done` 互斥

use crate::models::SpeedTestResult;
use crate::streaming::error::StreamError;
use serde::{Deserialize, Serialize};

/// 下发给客户端的归一化事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// 一个增量文本片段
    Content { content: String },
    /// 会话成功结束，携带完整结果记录
    Done { result: SpeedTestResult },
    /// 会话失败结束
    Error { error: String, category: String },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content {
            content: text.into(),
        }
    }

    pub fn done(result: SpeedTestResult) -> Self {
        StreamEvent::Done { result }
    }

    pub fn error(err: &StreamError) -> Self {
        StreamEvent::Error {
            error: err.to_string(),
            category: err.category().to_string(),
        }
    }

    /// 是否为终止事件
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    /// 编码为下发给客户端的 JSON 负载
    ///
    /// 事件类型全部可序列化，失败分支实际不可达，保留兜底值以免
    /// 单个事件拖垮整条流。
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> SpeedTestResult {
        SpeedTestResult {
            model: "gpt-4o-mini".to_string(),
            response: "Hello".to_string(),
            prompt_length: 3,
            response_length: 2,
            time_taken_ms: 1200,
            tokens_per_second: 1.67,
            provider: "OpenAI".to_string(),
        }
    }

    #[test]
    fn test_content_event_shape() {
        let json = serde_json::to_string(&StreamEvent::content("Hel")).unwrap();
        assert_eq!(json, r#"{"type":"content","content":"Hel"}"#);
    }

    #[test]
    fn test_done_event_shape() {
        let json = serde_json::to_string(&StreamEvent::done(sample_result())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "done");
        assert_eq!(value["result"]["model"], "gpt-4o-mini");
        assert_eq!(value["result"]["provider"], "OpenAI");
        assert_eq!(value["result"]["time_taken_ms"], 1200);
        assert_eq!(value["result"]["tokens_per_second"], 1.67);
    }

    #[test]
    fn test_error_event_carries_category() {
        let err = StreamError::MissingApiKey("OpenAI".to_string());
        let json = serde_json::to_string(&StreamEvent::error(&err)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["error"], "OpenAI API key not found");
        assert_eq!(value["category"], "configuration_error");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!StreamEvent::content("x").is_terminal());
        assert!(StreamEvent::done(sample_result()).is_terminal());
        assert!(StreamEvent::error(&StreamError::network("x")).is_terminal());
    }

    #[test]
    fn test_to_json_payload() {
        let payload = StreamEvent::content("hi").to_json();
        assert_eq!(payload, r#"{"type":"content","content":"hi"}"#);

        let payload = StreamEvent::error(&StreamError::network("x")).to_json();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "error");
    }
}
