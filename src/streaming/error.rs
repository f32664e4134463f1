//! 流式传输错误类型
//!
//! 覆盖一次测速会话中可能出现的全部故障类别：
//! 请求校验失败、缺少上游凭证、网络故障、上游 HTTP 错误、
//! 解析失败与持久化失败。解析失败与持久化失败只记录日志，
//! 永远不会作为 `error` 事件下发给客户端。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 流式传输错误
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StreamError {
    /// 请求校验失败（缺少 model 或 prompt）
    ///
    /// 在建立事件流之前同步拒绝。
    Validation(String),

    /// 缺少上游 API Key
    ///
    /// 携带 Provider 的标题名称（如 "OpenAI"）。
    /// 属于配置故障，在发起上游调用之前检测。
    MissingApiKey(String),

    /// 网络错误
    ///
    /// 连接被拒绝、重置或超时。
    Network(String),

    /// 上游返回了 HTTP 错误响应
    Upstream {
        /// HTTP 状态码
        status: u16,
        /// 错误消息（响应体摘录）
        message: String,
    },

    /// 解析错误
    ///
    /// 单行解码失败。会话内部通过跳过该行恢复，不会终止会话。
    Parse(String),

    /// 持久化失败
    ///
    /// `done` 事件已下发后写库失败，只记录日志。
    Persistence(String),

    /// 其他内部错误
    Internal(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Validation(msg) => write!(f, "{}", msg),
            StreamError::MissingApiKey(provider) => {
                write!(f, "{} API key not found", provider)
            }
            StreamError::Network(msg) => write!(f, "Upstream connection failed: {}", msg),
            StreamError::Upstream { status, message } => {
                write!(f, "Upstream error ({}): {}", status, message)
            }
            StreamError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StreamError::Persistence(msg) => write!(f, "Failed to record result: {}", msg),
            StreamError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for StreamError {}

// ============================================================================
// From trait 实现 - 用于错误转换
// ============================================================================

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamError::Network("request timed out".to_string())
        } else if err.is_connect() {
            StreamError::Network(format!("connect failed: {}", err))
        } else {
            StreamError::Network(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for StreamError {
    fn from(err: rusqlite::Error) -> Self {
        StreamError::Persistence(err.to_string())
    }
}

// ============================================================================
// 辅助方法
// ============================================================================

impl StreamError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        StreamError::Validation(msg.into())
    }

    /// 创建网络错误
    pub fn network(msg: impl Into<String>) -> Self {
        StreamError::Network(msg.into())
    }

    /// 创建上游错误
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        StreamError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        StreamError::Internal(msg.into())
    }

    /// 机器可读的故障类别，随 `error` 事件下发
    pub fn category(&self) -> &'static str {
        match self {
            StreamError::Validation(_) => "validation_error",
            StreamError::MissingApiKey(_) => "configuration_error",
            StreamError::Network(_) => "network_error",
            StreamError::Upstream { .. } => "upstream_error",
            StreamError::Parse(_) => "parse_error",
            StreamError::Persistence(_) => "persistence_error",
            StreamError::Internal(_) => "internal_error",
        }
    }

    /// 该错误是否允许下发给客户端
    ///
    /// 解析失败与持久化失败在会话内部吸收，其余类别对用户可见。
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self,
            StreamError::Parse(_) | StreamError::Persistence(_)
        )
    }
}

/// 截断消息到指定长度（用于上游错误响应体摘录）
pub fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        msg.to_string()
    } else {
        let mut end = max_len;
        while !msg.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &msg[..end])
    }
}
