//! OpenAI 适配器
//!
//! Chat Completions 风格：流式负载为 `choices[0].delta.content`，
//! 以 `data: [DONE]` 哨兵结束。非流式响应携带 usage 计数。

use crate::models::ProviderType;
use crate::providers::{
    data_payload, parse_payload, CompletionOutput, DecodedLine, ProviderAdapter, MAX_TOKENS,
};
use serde_json::{json, Value};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    /// 短名补全 `gpt-` 前缀（"4o-mini" -> "gpt-4o-mini"）
    fn canonical_model(&self, model: &str) -> String {
        if !model.contains('/') && !model.starts_with("gpt-") {
            format!("gpt-{}", model)
        } else {
            model.to_string()
        }
    }

    fn build_request(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: &str,
        prompt: &str,
        stream: bool,
    ) -> reqwest::RequestBuilder {
        client
            .post(API_URL)
            .bearer_auth(api_key)
            .json(&json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": MAX_TOKENS,
                "stream": stream,
            }))
    }

    fn decode_line(&self, line: &str) -> DecodedLine {
        decode_chat_completions_line("openai", line)
    }

    fn supports_completion(&self) -> bool {
        true
    }

    fn extract_completion(&self, body: &Value) -> Option<CompletionOutput> {
        let text = body
            .pointer("/choices/0/message/content")?
            .as_str()?
            .to_string();
        let usage = body
            .pointer("/usage/prompt_tokens")
            .and_then(Value::as_u64)
            .zip(
                body.pointer("/usage/completion_tokens")
                    .and_then(Value::as_u64),
            );
        Some(CompletionOutput { text, usage })
    }
}

/// Chat Completions 风格的行解码（OpenAI 与 OpenRouter 共用）
pub(crate) fn decode_chat_completions_line(provider: &str, line: &str) -> DecodedLine {
    let Some(payload) = data_payload(line) else {
        return DecodedLine::Ignored;
    };
    if payload == "[DONE]" {
        return DecodedLine::StreamEnd;
    }
    let Some(value) = parse_payload(provider, payload) else {
        return DecodedLine::Ignored;
    };
    match value.pointer("/choices/0/delta/content").and_then(Value::as_str) {
        Some(text) => DecodedLine::Content(text.to_string()),
        None => DecodedLine::Ignored,
    }
}
