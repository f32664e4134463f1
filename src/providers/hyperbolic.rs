//! Hyperbolic 适配器
//!
//! Completions 风格：请求体直接携带 prompt（非 messages 数组），
//! 流式负载的文本在 `choices[0].text`，以 `data: [DONE]` 结束。

use crate::models::ProviderType;
use crate::providers::{data_payload, parse_payload, DecodedLine, ProviderAdapter, MAX_TOKENS};
use serde_json::{json, Value};

const API_URL: &str = "https://api.hyperbolic.ai/v1/text/completions";

pub struct HyperbolicAdapter;

impl ProviderAdapter for HyperbolicAdapter {
    fn provider(&self) -> ProviderType {
        ProviderType::Hyperbolic
    }

    fn name(&self) -> &'static str {
        "Hyperbolic"
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
                "prompt": prompt,
                "max_tokens": MAX_TOKENS,
                "stream": stream,
            }))
    }

    fn decode_line(&self, line: &str) -> DecodedLine {
        let Some(payload) = data_payload(line) else {
            return DecodedLine::Ignored;
        };
        if payload == "[DONE]" {
            return DecodedLine::StreamEnd;
        }
        let Some(value) = parse_payload("hyperbolic", payload) else {
            return DecodedLine::Ignored;
        };
        match value.pointer("/choices/0/text").and_then(Value::as_str) {
            Some(text) => DecodedLine::Content(text.to_string()),
            None => DecodedLine::Ignored,
        }
    }
}
