//! 流式会话端到端测试
//!
//! 用合成上游驱动完整的 重组 -> 解码 -> 指标 -> 事件 流水线，
//! 覆盖事件顺序、终止事件唯一性、持久化交接与多会话隔离。

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use speedcast::streaming::UpstreamStream;
use speedcast::{
    adapter_for, run_session, ProviderType, ResultStore, SessionContext, SpeedTestResult,
    StreamError, StreamEvent,
};
use std::sync::Arc;
use std::time::Duration;

/// 记录到内存的假持久层
#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<SpeedTestResult>>,
    fail: bool,
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn record(&self, result: &SpeedTestResult) -> Result<(), StreamError> {
        if self.fail {
            return Err(StreamError::Persistence("disk full".to_string()));
        }
        self.records.lock().push(result.clone());
        Ok(())
    }
}

fn openai_upstream(fragments: &[&str]) -> UpstreamStream {
    let mut chunks: Vec<Result<Bytes, StreamError>> = fragments
        .iter()
        .map(|f| {
            Ok(Bytes::from(format!(
                "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n",
                f
            )))
        })
        .collect();
    chunks.push(Ok(Bytes::from("data: [DONE]\n")));
    Box::pin(stream::iter(chunks))
}

async fn wait_for_record(store: &MemoryStore) -> SpeedTestResult {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Some(record) = store.records.lock().first().cloned() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("record was never persisted")
}

#[tokio::test]
async fn test_hello_session_event_sequence() {
    let store = Arc::new(MemoryStore::default());
    let context = SessionContext::new(
        ProviderType::OpenAi,
        "gpt-4o-mini".to_string(),
        "say hello",
    );

    let events: Vec<StreamEvent> = run_session(
        context,
        openai_upstream(&["Hel", "lo"]),
        adapter_for(ProviderType::OpenAi),
        Some(store.clone()),
    )
    .collect()
    .await;

    // 恰好两条 content（顺序保持）加一条终止 done
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], StreamEvent::content("Hel"));
    assert_eq!(events[1], StreamEvent::content("lo"));
    let StreamEvent::Done { result } = &events[2] else {
        panic!("expected terminal done event");
    };
    assert_eq!(result.response, "Hello");
    assert!(result.tokens_per_second.is_finite());
    assert!(result.tokens_per_second >= 0.0);

    // done 之后结果被异步持久化
    let record = wait_for_record(&store).await;
    assert_eq!(record.response, "Hello");
    assert_eq!(record.model, "gpt-4o-mini");
}

#[tokio::test]
async fn test_terminal_event_is_always_last_and_unique() {
    let events: Vec<StreamEvent> = run_session(
        SessionContext::new(ProviderType::OpenAi, "gpt-4o-mini".to_string(), "p"),
        openai_upstream(&["a", "b", "c"]),
        adapter_for(ProviderType::OpenAi),
        None,
    )
    .collect()
    .await;

    let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal_count, 1);
    assert!(events.last().unwrap().is_terminal());
}

#[tokio::test]
async fn test_transport_fault_produces_error_and_no_record()
{
    let store = Arc::new(MemoryStore::default());
    let upstream: UpstreamStream = Box::pin(stream::iter(vec![
        Ok(Bytes::from(
            "data: {\"choices\":[{\"delta\":{\"content\":\"part\"}}]}\n",
        )),
        Err(StreamError::network("connection reset by peer")),
    ]));

    let events: Vec<StreamEvent> = run_session(
        SessionContext::new(ProviderType::OpenAi, "gpt-4o-mini".to_string(), "p"),
        upstream,
        adapter_for(ProviderType::OpenAi),
        Some(store.clone()),
    )
    .collect()
    .await;

    let StreamEvent::Error { category, .. } = events.last().unwrap() else {
        panic!("expected terminal error event");
    };
    assert_eq!(category, "network_error");

    // 失败会话不产出结果记录
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.records.lock().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_does_not_affect_done_event() {
    let store = Arc::new(MemoryStore {
        records: Mutex::new(Vec::new()),
        fail: true,
    });

    let events: Vec<StreamEvent> = run_session(
        SessionContext::new(ProviderType::OpenAi, "gpt-4o-mini".to_string(), "p"),
        openai_upstream(&["ok"]),
        adapter_for(ProviderType::OpenAi),
        Some(store),
    )
    .collect()
    .await;

    assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let store = Arc::new(MemoryStore::default());
    let mut handles = Vec::new();

    for i in 0..8u32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let marker = format!("session-{}-", i);
            let fragments: Vec<String> =
                (0..5).map(|j| format!("{}{}", marker, j)).collect();
            let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();

            let context = SessionContext::new(
                ProviderType::OpenAi,
                format!("gpt-model-{}", i),
                "prompt",
            );
            let events: Vec<StreamEvent> = run_session(
                context,
                openai_upstream(&refs),
                adapter_for(ProviderType::OpenAi),
                Some(store),
            )
            .collect()
            .await;

            let StreamEvent::Done { result } = events.last().unwrap() else {
                panic!("expected done event");
            };
            // 每个会话只看到自己上游的片段
            assert_eq!(result.response, fragments.concat());
            assert_eq!(result.model, format!("gpt-model-{}", i));
            for (idx, fragment) in fragments.iter().enumerate() {
                assert_eq!(events[idx], StreamEvent::content(fragment.clone()));
            }
            result.model.clone()
        }));
    }

    let mut models = Vec::new();
    for handle in handles {
        models.push(handle.await.unwrap());
    }
    models.sort();
    models.dedup();
    assert_eq!(models.len(), 8);

    // 所有会话的记录最终都写入共享持久层
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if store.records.lock().len() == 8 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("not all records were persisted");
}

#[tokio::test]
async fn test_gemini_session_end_to_end() {
    let upstream: UpstreamStream = Box::pin(stream::iter(vec![
        Ok(Bytes::from(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Ge\"}]}}]}\n",
        )),
        Ok(Bytes::from(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"mini\"}]}}]}\n\
             data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n",
        )),
    ]));

    let events: Vec<StreamEvent> = run_session(
        SessionContext::new(ProviderType::Gemini, "gemini-1.5-flash".to_string(), "p"),
        upstream,
        adapter_for(ProviderType::Gemini),
        None,
    )
    .collect()
    .await;

    let StreamEvent::Done { result } = events.last().unwrap() else {
        panic!("expected done event");
    };
    assert_eq!(result.response, "Gemini");
    assert_eq!(result.provider, "Google");
}
