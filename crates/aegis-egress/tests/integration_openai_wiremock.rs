//! Integration tests for the OpenAI connector using wiremock
//!
//! These mock the OpenAI API to verify the connector's HTTP behavior,
//! including the retry budget.

use aegis_core::{CompletionOptions, CompletionProvider, FinishReason, ProviderErrorKind};
use aegis_egress::client::HttpClientConfig;
use aegis_egress::openai::{OpenAIConfig, OpenAIConnector};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn success_body() -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1234567890,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "This is a generated response."
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}

fn connector_for(server: &MockServer, max_retries: u32) -> OpenAIConnector {
    let config = OpenAIConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        organization: None,
        client_config: HttpClientConfig {
            max_retries,
            retry_delay_ms: 1,
            ..Default::default()
        },
    };
    OpenAIConnector::new(config).unwrap()
}

#[tokio::test]
async fn test_send_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server, 3);
    let response = connector
        .complete("gpt-4o-mini", "Hello!", &CompletionOptions::new(100))
        .await
        .unwrap();

    assert_eq!(response.text, "This is a generated response.");
    assert_eq!(response.input_tokens, 10);
    assert_eq!(response.output_tokens, 5);
    assert_eq!(response.total_tokens(), 15);
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.model_id, "gpt-4o-mini");
}

#[tokio::test]
async fn test_rate_limited_twice_then_success() {
    let mock_server = MockServer::start().await;

    // First two attempts are throttled, the third succeeds
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": { "message": "Rate limit reached" }
        })))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server, 3);
    let response = connector
        .complete("gpt-4o-mini", "Hello!", &CompletionOptions::new(100))
        .await
        .unwrap();

    assert_eq!(response.text, "This is a generated response.");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_non_retryable_error_makes_single_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid API key" }
        })))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server, 3);
    let result = connector
        .complete("gpt-4o-mini", "Hello!", &CompletionOptions::new(100))
        .await;

    match result {
        Err(aegis_core::Error::Provider { kind, message }) => {
            assert_eq!(kind, ProviderErrorKind::Authentication);
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_retry_budget_exhausted_surfaces_last_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": { "message": "Service overloaded" }
        })))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server, 2);
    let result = connector
        .complete("gpt-4o-mini", "Hello!", &CompletionOptions::new(100))
        .await;

    match result {
        Err(aegis_core::Error::Provider { kind, .. }) => {
            assert_eq!(kind, ProviderErrorKind::ServiceUnavailable);
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    // max_retries + 1 attempts in total
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_sampling_parameters_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&mock_server)
        .await;

    let connector = connector_for(&mock_server, 0);
    let options = CompletionOptions {
        max_tokens: 256,
        temperature: Some(0.7),
        top_p: Some(0.9),
        n: None,
        stop_sequences: vec!["END".to_string()],
    };
    connector
        .complete("gpt-4o-mini", "Hello!", &options)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["max_tokens"], 256);
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["top_p"], 0.9);
    assert_eq!(body["stop"][0], "END");
    assert_eq!(body["messages"][0]["role"], "user");
}
