use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use station_persist::FileBackend;
use station_session::{ChatSession, FailureKind, HistoryStore, Message, SessionConfig, TurnOutcome};
use station_stream::{SseTransport, SseTransportConfig};

const PREFIX: &str = "/ai-agent-station/api/v1";
const PATH: &str = "/ai-agent-station/api/v1/ai/agent/chat_stream";

fn frame(text: &str, finish_reason: Option<&str>) -> String {
    let chunk = json!({
        "result": {
            "output": {
                "text": text,
                "metadata": { "finishReason": finish_reason }
            }
        }
    });
    format!("data: {}\n\n", chunk)
}

fn session_for(url: &str, store: HistoryStore) -> ChatSession {
    let timeout = Duration::from_millis(500);
    let transport = SseTransport::new(SseTransportConfig::new(url, PREFIX).with_connect_timeout(timeout)).unwrap();
    let config = SessionConfig::new("agent-1").with_rag("3").with_connect_timeout(timeout);
    ChatSession::new(config, Arc::new(transport), store)
}

#[tokio::test]
async fn test_turn_over_http_is_persisted() {
    let mut server = mockito::Server::new_async().await;
    let body = format!("{}{}{}", frame("Hi", None), frame(" there", None), frame("", Some("STOP")));
    let mock = server
        .mock("GET", PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("aiAgentId".into(), "agent-1".into()),
            Matcher::UrlEncoded("ragId".into(), "3".into()),
            Matcher::UrlEncoded("message".into(), "hello".into()),
        ]))
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(Arc::new(FileBackend::open(dir.path()).unwrap()));
    let mut session = session_for(&server.url(), store);
    let id = session.bootstrap();

    session.submit_message("hello");
    let outcome = session.drive_turn().await;
    assert_eq!(
        outcome,
        Some(TurnOutcome::Completed {
            content: "Hi there".to_string()
        })
    );
    mock.assert_async().await;

    // A fresh store over the same directory sees the finished turn
    let reopened = HistoryStore::new(Arc::new(FileBackend::open(dir.path()).unwrap()));
    assert_eq!(reopened.current_id(), Some(id.clone()));
    let conversation = reopened.get(&id).unwrap();
    assert_eq!(conversation.name, "hello");
    assert_eq!(conversation.messages, vec![Message::user("hello"), Message::assistant("Hi there")]);
}

#[tokio::test]
async fn test_malformed_first_frame_over_http() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_body("data: {\"code\":\"0001\"}\n\n")
        .create_async()
        .await;

    let mut session = session_for(&server.url(), HistoryStore::in_memory());
    session.bootstrap();
    session.submit_message("hello");

    let Some(TurnOutcome::Failed(failure)) = session.drive_turn().await else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::MalformedResponse);
    assert_eq!(session.current_conversation().unwrap().messages, vec![Message::user("hello")]);
}

#[tokio::test]
async fn test_unreachable_server() {
    let mut session = session_for("http://127.0.0.1:1", HistoryStore::in_memory());
    session.bootstrap();
    session.submit_message("hello");

    let Some(TurnOutcome::Failed(failure)) = session.drive_turn().await else {
        panic!("expected failure");
    };
    assert!(matches!(
        failure.kind,
        FailureKind::ConnectionFailed | FailureKind::NoResponse
    ));
    assert_eq!(session.current_conversation().unwrap().messages.len(), 1);
}
