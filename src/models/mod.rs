//! 数据模型定义
//!
//! 定义速度测试的请求、结果和数据库记录类型。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 上游 Provider 类型
///
/// 每个变体对应一个支持流式测速的上游 API。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI Chat Completions API
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
    /// Google Gemini GenerateContent API
    Gemini,
    /// OpenRouter（OpenAI 兼容）
    OpenRouter,
    /// Hyperbolic Completions API
    Hyperbolic,
}

impl ProviderType {
    /// 所有支持的 Provider
    pub const ALL: [ProviderType; 5] = [
        ProviderType::OpenAi,
        ProviderType::Anthropic,
        ProviderType::Gemini,
        ProviderType::OpenRouter,
        ProviderType::Hyperbolic,
    ];

    /// 路由键（请求路径中使用的小写标识）
    pub fn key(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Gemini => "gemini",
            ProviderType::OpenRouter => "openrouter",
            ProviderType::Hyperbolic => "hyperbolic",
        }
    }

    /// 标题形式的名称，用于错误消息（如 "OpenAI API key not found"）
    pub fn title(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "OpenAI",
            ProviderType::Anthropic => "Anthropic",
            ProviderType::Gemini => "Gemini",
            ProviderType::OpenRouter => "OpenRouter",
            ProviderType::Hyperbolic => "Hyperbolic",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAi),
            "anthropic" => Ok(ProviderType::Anthropic),
            "gemini" => Ok(ProviderType::Gemini),
            "openrouter" => Ok(ProviderType::OpenRouter),
            "hyperbolic" => Ok(ProviderType::Hyperbolic),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// 速度测试请求
///
/// 由客户端提交，不可变；model 与 prompt 必须非空。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestRequest {
    pub model: String,
    pub prompt: String,
}

impl SpeedTestRequest {
    /// 校验请求字段非空
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() || self.prompt.trim().is_empty() {
            return Err("Model and prompt are required".to_string());
        }
        Ok(())
    }
}

/// 速度测试结果
///
/// 每个完成的会话恰好产生一份，随 `done` 事件下发并写入持久层。
/// prompt_length/response_length 为 token 数：流式路径按字符数估算
/// （ceil(len/4)），非流式路径优先采用上游返回的 usage 计数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestResult {
    /// 规范化后的模型名（非调用方原始输入）
    pub model: String,
    /// 完整响应文本
    pub response: String,
    pub prompt_length: u64,
    pub response_length: u64,
    pub time_taken_ms: u64,
    pub tokens_per_second: f64,
    /// 展示名称（"OpenAI" / "Anthropic" / "Google" / ...）
    pub provider: String,
}

/// 待插入的测试记录
///
/// 对应 `speed_tests` 表的一行（不含自增 id 与时间戳）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSpeedTest {
    pub model_name: String,
    pub prompt_length: u64,
    pub response_length: u64,
    pub time_taken_ms: u64,
    pub tokens_per_second: f64,
    pub provider: String,
}

impl From<&SpeedTestResult> for NewSpeedTest {
    fn from(result: &SpeedTestResult) -> Self {
        Self {
            model_name: result.model.clone(),
            prompt_length: result.prompt_length,
            response_length: result.response_length,
            time_taken_ms: result.time_taken_ms,
            tokens_per_second: result.tokens_per_second,
            provider: result.provider.clone(),
        }
    }
}

/// 已保存的测试记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestRow {
    pub id: i64,
    pub model_name: String,
    pub prompt_length: u64,
    pub response_length: u64,
    pub time_taken_ms: u64,
    pub tokens_per_second: f64,
    pub provider: String,
    pub test_timestamp: String,
}
