use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use station_api::{AgentCatalog, ApiError, StationClient};

const PREFIX: &str = "/ai-agent-station/api/v1";

fn client_for(url: &str) -> StationClient {
    StationClient::new(url, PREFIX, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_agents_sends_channel_form() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ai-agent-station/api/v1/ai/admin/agent/queryAllAgentConfigListByChannel")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::UrlEncoded("channel".into(), "chat_stream".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "code": "0000",
                "info": "success",
                "data": [
                    {"id": 6001, "agentName": "Weather"},
                    {"id": "6002", "agentName": "Docs"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let agents = client_for(&server.url()).list_agents("chat_stream").await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].id, "6001");
    assert_eq!(agents[0].agent_name, "Weather");
    assert_eq!(agents[1].id, "6002");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_success_flag_without_data() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ai-agent-station/api/v1/ai/admin/rag/queryAllValidRagOrder")
        .with_body(json!({"success": true}).to_string())
        .create_async()
        .await;

    let orders = client_for(&server.url()).list_rag_orders().await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_system_prompts() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ai-agent-station/api/v1/ai/admin/client/system/prompt/queryAllSystemPromptConfig")
        .with_body(
            json!({
                "code": "0000",
                "data": [{"promptName": "Concise", "promptContent": "Answer briefly."}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let prompts = client_for(&server.url()).list_system_prompts().await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].apply_to("Why is the sky blue?"), "Answer briefly.\n\nWhy is the sky blue?");
}

#[tokio::test]
async fn test_rejected_envelope() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ai-agent-station/api/v1/ai/admin/rag/queryAllValidRagOrder")
        .with_body(json!({"code": "0003", "info": "no permission"}).to_string())
        .create_async()
        .await;

    let err = client_for(&server.url()).list_rag_orders().await.unwrap_err();
    match err {
        ApiError::Rejected { code, info } => {
            assert_eq!(code, "0003");
            assert_eq!(info, "no permission");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ai-agent-station/api/v1/ai/admin/rag/queryAllValidRagOrder")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let err = client_for(&server.url()).list_rag_orders().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 502, ref body } if body == "bad gateway"));
}

#[test]
fn test_base_url_joins_prefix() {
    let client = StationClient::new("http://localhost:8091/", PREFIX, Duration::from_secs(1)).unwrap();
    assert_eq!(client.base_url(), "http://localhost:8091/ai-agent-station/api/v1");
}

#[tokio::test]
async fn test_unreachable_backend() {
    let err = client_for("http://127.0.0.1:1").list_system_prompts().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}
