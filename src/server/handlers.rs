//! 请求处理器
//!
//! 流式测速、非流式测速与历史记录的 HTTP 入口。
//! 校验故障与配置故障在事件流建立之前同步拒绝；
//! 流建立之后的一切故障都折叠为终止 `error` 事件。

use crate::models::{NewSpeedTest, ProviderType, SpeedTestRequest, SpeedTestResult};
use crate::providers::adapter_for;
use crate::server::AppState;
use crate::streaming::{
    open_upstream, run_session, whole_interval_tps, ResultStore, SessionContext, SpeedMetrics,
    StreamError, StreamEvent,
};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// 流式测速的查询参数
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    model: String,
    #[serde(default)]
    prompt: String,
}

/// 把一个分类过的故障编码为 JSON 错误响应
///
/// 与 `error` 事件同构：消息加机器可读的故障类别。
fn fault(status: StatusCode, err: &StreamError) -> Response {
    (
        status,
        Json(json!({"error": err.to_string(), "category": err.category()})),
    )
        .into_response()
}

/// 非流式路径的上游错误消息沿用既有线上文本，不走故障分类
fn server_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message.into()})),
    )
        .into_response()
}

/// GET /api/test/:provider/stream
///
/// 打开上游流式连接并把归一化事件以 SSE 推送给客户端。
/// 客户端断开时事件流被丢弃，上游连接随之关闭。
pub async fn stream_test(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let provider: ProviderType = match provider.parse() {
        Ok(p) => p,
        Err(msg) => return fault(StatusCode::BAD_REQUEST, &StreamError::validation(msg)),
    };

    let request = SpeedTestRequest {
        model: query.model,
        prompt: query.prompt,
    };
    if let Err(msg) = request.validate() {
        return fault(StatusCode::BAD_REQUEST, &StreamError::validation(msg));
    }

    let adapter = adapter_for(provider);
    // 缺少凭证是配置故障，在发起上游调用前短路
    let Some(api_key) = state.config.api_keys.key_for(provider) else {
        let err = StreamError::MissingApiKey(provider.title().to_string());
        warn!(provider = %provider, "缺少 API Key，拒绝测速请求");
        return fault(StatusCode::INTERNAL_SERVER_ERROR, &err);
    };
    let api_key = api_key.to_string();

    let model = adapter.canonical_model(&request.model);
    let context = SessionContext::new(provider, model.clone(), &request.prompt);
    info!(
        session_id = %context.session_id,
        provider = %provider,
        model = %model,
        "开始流式测速"
    );

    let client = state.client.clone();
    let store: Arc<dyn ResultStore> = state.db.clone();
    let prompt = request.prompt;

    let events = async_stream::stream! {
        match open_upstream(&client, adapter, &api_key, &model, &prompt).await {
            Ok(upstream) => {
                let session = run_session(context, upstream, adapter, Some(store));
                futures::pin_mut!(session);
                while let Some(event) = session.next().await {
                    yield event;
                }
            }
            Err(e) => {
                error!(error = %e, "上游调用建立失败");
                yield StreamEvent::error(&e);
            }
        }
    };

    Sse::new(events.map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json()))))
        .into_response()
}

/// POST /api/test/:provider
///
/// 非流式测速。仅 OpenAI 与 Anthropic 支持；优先使用上游回报的
/// usage 计数，缺失时按字符数估算。
pub async fn run_test(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let provider: ProviderType = match provider.parse() {
        Ok(p) => p,
        Err(msg) => return fault(StatusCode::BAD_REQUEST, &StreamError::validation(msg)),
    };

    let request = SpeedTestRequest {
        model: body["model"].as_str().unwrap_or_default().to_string(),
        prompt: body["prompt"].as_str().unwrap_or_default().to_string(),
    };
    if let Err(msg) = request.validate() {
        return fault(StatusCode::BAD_REQUEST, &StreamError::validation(msg));
    }

    let adapter = adapter_for(provider);
    if !adapter.supports_completion() {
        return fault(
            StatusCode::BAD_REQUEST,
            &StreamError::validation("Non-streaming test is not supported for this provider"),
        );
    }
    let Some(api_key) = state.config.api_keys.key_for(provider) else {
        let err = StreamError::MissingApiKey(provider.title().to_string());
        return fault(StatusCode::INTERNAL_SERVER_ERROR, &err);
    };

    let model = adapter.canonical_model(&request.model);
    let started = Instant::now();

    let response = match adapter
        .build_request(&state.client, api_key, &model, &request.prompt, false)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(provider = %provider, error = %e, "非流式上游调用失败");
            return server_error(format!("Error calling {} API", provider.title()));
        }
    };

    let status = response.status();
    let payload: Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            error!(provider = %provider, error = %e, "上游响应解析失败");
            return server_error(format!("Error calling {} API", provider.title()));
        }
    };
    if !status.is_success() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("Error calling {} API", provider.title()),
                "details": payload,
            })),
        )
            .into_response();
    }

    let Some(output) = adapter.extract_completion(&payload) else {
        return server_error(format!(
            "Unexpected {} response format",
            provider.title()
        ));
    };
    let time_taken_ms = started.elapsed().as_millis() as u64;

    let (prompt_tokens, response_tokens) = output.usage.unwrap_or_else(|| {
        (
            SpeedMetrics::estimate_tokens(request.prompt.chars().count()),
            SpeedMetrics::estimate_tokens(output.text.chars().count()),
        )
    });

    let result = SpeedTestResult {
        model,
        response: output.text,
        prompt_length: prompt_tokens,
        response_length: response_tokens,
        time_taken_ms,
        tokens_per_second: whole_interval_tps(response_tokens, time_taken_ms),
        provider: adapter.name().to_string(),
    };

    // 与流式路径一致：写库失败只记日志
    let store: Arc<dyn ResultStore> = state.db.clone();
    let record = result.clone();
    tokio::spawn(async move {
        if let Err(e) = store.record(&record).await {
            warn!(error = %e, "测试记录写入失败");
        }
    });

    Json(result).into_response()
}

/// GET /api/tests
pub async fn list_tests(State(state): State<AppState>) -> Response {
    match state.db.list_all() {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => fault(StatusCode::INTERNAL_SERVER_ERROR, &StreamError::from(e)),
    }
}

/// POST /api/tests
///
/// 客户端直接提交一条完成的测试记录。
pub async fn save_test(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let required = [
        "model_name",
        "prompt_length",
        "response_length",
        "time_taken_ms",
        "tokens_per_second",
        "provider",
    ];
    if required.iter().any(|key| body.get(key).is_none()) {
        return fault(
            StatusCode::BAD_REQUEST,
            &StreamError::validation("All fields are required"),
        );
    }

    let test = NewSpeedTest {
        model_name: body["model_name"].as_str().unwrap_or_default().to_string(),
        prompt_length: body["prompt_length"].as_u64().unwrap_or(0),
        response_length: body["response_length"].as_u64().unwrap_or(0),
        time_taken_ms: body["time_taken_ms"].as_u64().unwrap_or(0),
        tokens_per_second: body["tokens_per_second"].as_f64().unwrap_or(0.0),
        provider: body["provider"].as_str().unwrap_or_default().to_string(),
    };

    match state.db.insert(&test) {
        Ok(id) => Json(json!({
            "id": id,
            "message": "Speed test saved successfully",
        }))
        .into_response(),
        Err(e) => fault(StatusCode::INTERNAL_SERVER_ERROR, &StreamError::from(e)),
    }
}
