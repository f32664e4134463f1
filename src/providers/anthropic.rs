//! Anthropic 适配器
//!
//! Messages 风格：只有事件类型为 `content_block_delta` 的负载携带
//! 文本增量（`delta.text`）。没有结束哨兵，通道关闭即数据结束。

use crate::models::ProviderType;
use crate::providers::{
    data_payload, parse_payload, CompletionOutput, DecodedLine, ProviderAdapter, MAX_TOKENS,
};
use serde_json::{json, Value};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic"
    }

    /// 短名补全 `claude-` 前缀
    fn canonical_model(&self, model: &str) -> String {
        if !model.contains('/') && !model.starts_with("claude-") {
            format!("claude-{}", model)
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
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "messages": [{"role": "user", "content": prompt}],
                "stream": stream,
            }))
    }

    fn decode_line(&self, line: &str) -> DecodedLine {
        let Some(payload) = data_payload(line) else {
            return DecodedLine::Ignored;
        };
        let Some(value) = parse_payload("anthropic", payload) else {
            return DecodedLine::Ignored;
        };
        if value.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return DecodedLine::Ignored;
        }
        match value.pointer("/delta/text").and_then(Value::as_str) {
            Some(text) => DecodedLine::Content(text.to_string()),
            None => DecodedLine::Ignored,
        }
    }

    fn supports_completion(&self) -> bool {
        true
    }

    fn extract_completion(&self, body: &Value) -> Option<CompletionOutput> {
        let text = body.pointer("/content/0/text")?.as_str()?.to_string();
        let usage = body
            .pointer("/usage/input_tokens")
            .and_then(Value::as_u64)
            .zip(body.pointer("/usage/output_tokens").and_then(Value::as_u64));
        Some(CompletionOutput { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_model() {
        let adapter = AnthropicAdapter;
        assert_eq!(
            adapter.canonical_model("claude-3-haiku-20240307"),
            "claude-3-haiku-20240307"
        );
        assert_eq!(
            adapter.canonical_model("3-haiku-20240307"),
            "claude-3-haiku-20240307"
        );
        assert_eq!(
            adapter.canonical_model("anthropic/claude-3-opus"),
            "anthropic/claude-3-opus"
        );
    }

    #[test]
    fn test_decode_content_block_delta() {
        let line = r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(
            AnthropicAdapter.decode_line(line),
            DecodedLine::Content("Hi".to_string())
        );
    }

    #[test]
    fn test_decode_other_event_types_ignored() {
        for line in [
            r#"data: {"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"data: {"type":"content_block_start","content_block":{"type":"text"}}"#,
            r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
            r#"data: {"type":"message_stop"}"#,
            r#"data: {"type":"ping"}"#,
        ] {
            assert_eq!(AnthropicAdapter.decode_line(line), DecodedLine::Ignored);
        }
    }

    #[test]
    fn test_decode_delta_without_text_ignored() {
        let line = r#"data: {"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{"}}"#;
        assert_eq!(AnthropicAdapter.decode_line(line), DecodedLine::Ignored);
    }

    #[test]
    fn test_extract_completion() {
        let body = json!({
            "content": [{"type": "text", "text": "Hello"}],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let out = AnthropicAdapter.extract_completion(&body).unwrap();
        assert_eq!(out.text, "Hello");
        assert_eq!(out.usage, Some((10, 5)));
    }

    #[test]
    fn test_extract_completion_without_usage_estimates_later() {
        let body = json!({"content": [{"text": "Hello"}]});
        let out = AnthropicAdapter.extract_completion(&body).unwrap();
        assert_eq!(out.usage, None);
    }
}
