//! Google Gemini 适配器
//!
//! GenerateContent 风格：文本在 `candidates[0].content.parts[0].text`。
//! API Key 通过 URL query 传递而非鉴权头。协议本身没有 `[DONE]` 哨兵，
//! 但仍按哨兵处理以防上游变更。

use crate::models::ProviderType;
use crate::providers::{data_payload, parse_payload, DecodedLine, ProviderAdapter, MAX_TOKENS};
use serde_json::{json, Value};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn name(&self) -> &'static str {
        "Google"
    }

    fn build_request(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: &str,
        prompt: &str,
        _stream: bool,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/{}:streamGenerateContent", API_BASE, model);
        client
            .post(url)
            .query(&[("alt", "sse"), ("key", api_key)])
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
                "generationConfig": {"maxOutputTokens": MAX_TOKENS},
            }))
    }

    fn decode_line(&self, line: &str) -> DecodedLine {
        let Some(payload) = data_payload(line) else {
            return DecodedLine::Ignored;
        };
        if payload == "[DONE]" {
            return DecodedLine::StreamEnd;
        }
        let Some(value) = parse_payload("gemini", payload) else {
            return DecodedLine::Ignored;
        };
        match value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
        {
            Some(text) => DecodedLine::Content(text.to_string()),
            None => DecodedLine::Ignored,
        }
    }
}
