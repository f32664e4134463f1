//! OpenRouter 适配器
//!
//! OpenAI 兼容的线格式，解码逻辑与 OpenAI 共用；模型名自带
//! `vendor/model` 命名空间，不做改写。需要额外的 HTTP-Referer 头。

use crate::models::ProviderType;
use crate::providers::openai::decode_chat_completions_line;
use crate::providers::{DecodedLine, ProviderAdapter, MAX_TOKENS};
use serde_json::json;

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REFERER: &str = "https://llm-speed-test.app";

pub struct OpenRouterAdapter;

impl ProviderAdapter for OpenRouterAdapter {
    fn provider(&self) -> ProviderType {
        ProviderType::OpenRouter
    }

    fn name(&self) -> &'static str {
        "OpenRouter"
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
            .header("HTTP-Referer", REFERER)
            .json(&json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": MAX_TOKENS,
                "stream": stream,
            }))
    }

    fn decode_line(&self, line: &str) -> DecodedLine {
        decode_chat_completions_line("openrouter", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_model_unchanged() {
        assert_eq!(
            OpenRouterAdapter.canonical_model("anthropic/claude-3-opus"),
            "anthropic/claude-3-opus"
        );
        assert_eq!(
            OpenRouterAdapter.canonical_model("meta-llama/llama-3-70b-instruct"),
            "meta-llama/llama-3-70b-instruct"
        );
    }

    #[test]
    fn test_decode_matches_openai_format() {
        let line = r#"data: {"choices":[{"delta":{"content":"x"}}]}"#;
        assert_eq!(
            OpenRouterAdapter.decode_line(line),
            DecodedLine::Content("x".to_string())
        );
        assert_eq!(
            OpenRouterAdapter.decode_line("data: [DONE]"),
            DecodedLine::StreamEnd
        );
    }

    #[test]
    fn test_decode_openrouter_comment_line_ignored() {
        // OpenRouter 会发送处理中注释行
        assert_eq!(
            OpenRouterAdapter.decode_line(": OPENROUTER PROCESSING"),
            DecodedLine::Ignored
        );
    }
}
