//! Provider 适配器
//!
//! 每个上游使用不同的端点、鉴权头与流式负载结构。适配器把这些差异
//! 收敛到一个能力集合后面：构造上游请求、规范化模型名、逐行解码。
//! 会话主流程对所有 Provider 走同一条代码路径，按 Provider 键选择
//! 适配器，消除按 Provider 复制控制流的漂移。

mod anthropic;
mod gemini;
mod hyperbolic;
mod openai;
mod openrouter;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use hyperbolic::HyperbolicAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;

use crate::models::ProviderType;
use serde_json::Value;

/// 上游请求的最大生成 token 数
pub const MAX_TOKENS: u32 = 1024;

/// 一条逻辑行的解码结果
///
/// 每行至多产出一个片段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// 提取出的文本增量（可能为空字符串，调用方跳过空串）
    Content(String),
    /// 数据结束哨兵（`[DONE]`），行本身不产出内容
    StreamEnd,
    /// 与当前 Provider 无关的行：前缀不匹配、JSON 损坏或字段缺失。
    /// 静默跳过，绝不让单条畸形心跳终止整个会话。
    Ignored,
}

/// Provider 适配器能力集合
pub trait ProviderAdapter: Send + Sync {
    /// Provider 键
    fn provider(&self) -> ProviderType;

    /// 结果记录中的展示名称
    fn name(&self) -> &'static str;

    /// 模型名规范化
    ///
    /// 调用方给出缺少厂商前缀的短名时重写为该 Provider 的规范形式；
    /// 已规范的名称原样返回。规范名出现在上游请求与结果记录中。
    fn canonical_model(&self, model: &str) -> String {
        model.to_string()
    }

    /// 构造上游请求（URL、请求体、鉴权头）
    fn build_request(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: &str,
        prompt: &str,
        stream: bool,
    ) -> reqwest::RequestBuilder;

    /// 解码一条完整逻辑行
    fn decode_line(&self, line: &str) -> DecodedLine;

    /// 是否支持非流式测试
    ///
    /// 仅 OpenAI 与 Anthropic 支持；其余 Provider 只能走流式路径。
    fn supports_completion(&self) -> bool {
        false
    }

    /// 从非流式响应体提取文本与 usage 计数
    fn extract_completion(&self, _body: &Value) -> Option<CompletionOutput> {
        None
    }
}

/// 非流式调用的提取结果
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutput {
    pub text: String,
    /// 上游回报的 (输入 token 数, 输出 token 数)，缺失时由调用方估算
    pub usage: Option<(u64, u64)>,
}

/// 按 Provider 键选择适配器
pub fn adapter_for(provider: ProviderType) -> &'static dyn ProviderAdapter {
    match provider {
        ProviderType::OpenAi => &OpenAiAdapter,
        ProviderType::Anthropic => &AnthropicAdapter,
        ProviderType::Gemini => &GeminiAdapter,
        ProviderType::OpenRouter => &OpenRouterAdapter,
        ProviderType::Hyperbolic => &HyperbolicAdapter,
    }
}

/// 提取 `data: ` 前缀之后的负载
///
/// 前缀不匹配或负载为空白时返回 None。上游会在数据行之间穿插注释
/// 与保活行，这些行一律跳过。
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data: ")?;
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// 解析负载为 JSON；失败只记 debug 日志
pub(crate) fn parse_payload(provider: &str, payload: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(provider, error = %e, "跳过无法解析的流式数据行");
            None
        }
    }
}
