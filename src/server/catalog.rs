//! 可用模型目录
//!
//! 从 litellm 的价格表拉取 OpenAI / Anthropic 模型名并按 Provider
//! 分组；Gemini / OpenRouter / Hyperbolic 使用精选静态列表。
//! 拉取失败时整体回退到静态目录。

use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

const MODEL_PRICES_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

/// 常用 OpenAI 模型，排在目录最前
const OPENAI_PRIORITY: [&str; 5] = ["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"];

const GEMINI_MODELS: [&str; 3] = ["gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"];

const OPENROUTER_MODELS: [&str; 13] = [
    "anthropic/claude-3-opus",
    "anthropic/claude-3-sonnet",
    "anthropic/claude-3-haiku",
    "openai/gpt-4-turbo",
    "openai/gpt-4o",
    "meta-llama/llama-3-70b-instruct",
    "meta-llama/llama-3-8b-instruct",
    "mistralai/mistral-large",
    "mistralai/mistral-medium",
    "mistralai/mistral-small",
    "deepseek/deepseek-coder",
    "deepseek/deepseek-chat",
    "deepseek/deepseek-llm-67b-chat",
];

const HYPERBOLIC_MODELS: [&str; 7] = [
    "bedrock/anthropic.claude-3-sonnet",
    "bedrock/anthropic.claude-3-haiku",
    "bedrock/amazon.titan-text-express",
    "bedrock/meta.llama3-70b-instruct",
    "bedrock/meta.llama3-8b-instruct",
    "azure/gpt-4",
    "azure/gpt-35-turbo",
];

/// GET /api/models
pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    match fetch_catalog(&state.client).await {
        Ok(catalog) => Json(catalog),
        Err(e) => {
            warn!(error = %e, "模型目录拉取失败，使用静态回退列表");
            Json(fallback_catalog())
        }
    }
}

async fn fetch_catalog(client: &reqwest::Client) -> Result<Value, reqwest::Error> {
    let prices: Value = client
        .get(MODEL_PRICES_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let keys: Vec<&str> = prices
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut openai: Vec<String> = keys
        .iter()
        .filter(|k| k.starts_with("gpt") || k.starts_with("openai/"))
        .filter(|k| !k.contains("instruct") && !k.contains("embedding"))
        .map(|k| k.trim_start_matches("openai/").to_string())
        .collect();
    if !openai.iter().any(|m| m == "gpt-4o-mini") {
        openai.push("gpt-4o-mini".to_string());
    }
    let openai = prioritize(openai, &OPENAI_PRIORITY);

    let anthropic: Vec<String> = keys
        .iter()
        .filter(|k| k.starts_with("claude") || k.starts_with("anthropic/"))
        .map(|k| k.trim_start_matches("anthropic/").to_string())
        .collect();

    Ok(json!({
        "openai": openai,
        "anthropic": dedupe(anthropic),
        "gemini": GEMINI_MODELS,
        "openrouter": OPENROUTER_MODELS,
        "hyperbolic": HYPERBOLIC_MODELS,
    }))
}

/// 把常用模型提到最前并去重
fn prioritize(models: Vec<String>, priority: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = priority.iter().map(|m| m.to_string()).collect();
    ordered.extend(models.into_iter().filter(|m| !priority.contains(&m.as_str())));
    dedupe(ordered)
}

fn dedupe(models: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    models.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

/// 静态回退目录
fn fallback_catalog() -> Value {
    json!({
        "openai": OPENAI_PRIORITY,
        "anthropic": [
            "claude-3-haiku-20240307",
            "claude-3-sonnet-20240229",
            "claude-3-opus-20240229",
        ],
        "gemini": GEMINI_MODELS,
        "openrouter": [
            "anthropic/claude-3-opus",
            "openai/gpt-4o",
            "meta-llama/llama-3-70b-instruct",
            "deepseek/deepseek-coder",
        ],
        "hyperbolic": [
            "bedrock/anthropic.claude-3-sonnet",
            "azure/gpt-4",
            "bedrock/meta.llama3-70b-instruct",
        ],
    })
}
