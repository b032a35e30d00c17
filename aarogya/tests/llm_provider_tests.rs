use serde_json::json;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use aarogya::config::LlmConfig;
use aarogya::error::AppError;
use aarogya::llm::{ChatMessage, ContentBlock, LlmBackend, LlmProvider, VisionModel};

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn llm_config(model: &str, base_url: String, max_retries: u32) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries,
        max_tokens: 2000,
    }
}

fn completion_body(content: Option<&str>) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

fn image_question() -> Vec<ChatMessage> {
    vec![ChatMessage::user(vec![
        ContentBlock::image(PNG_MAGIC.to_vec()),
        ContentBlock::text("Analyze this medicine image."),
    ])]
}

#[test]
fn test_provider_detection() {
    let provider = LlmProvider::new(Some(&llm_config(
        "openrouter/meta-llama/llama-3.2-11b-vision-instruct",
        "http://localhost:1".to_string(),
        0,
    )));

    assert!(matches!(provider.backend(), LlmBackend::OpenRouter));
    assert!(provider.is_available());
    assert!(!provider.is_initialized());
}

#[tokio::test]
async fn test_generate_sends_image_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("data:image/png;base64,"))
        .and(body_string_contains("Analyze this medicine image."))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body(Some(r#"{"drug_name": "Advil"}"#))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = llm_config("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 0);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.generate(&image_question()).await;

    match result {
        Ok(value) => assert_eq!(value, r#"{"drug_name": "Advil"}"#),
        Err(error) => panic!("Expected generation to succeed, got: {error}"),
    }
    assert!(provider.is_initialized());
}

#[tokio::test]
async fn test_missing_content_is_empty_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(None)))
        .mount(&server)
        .await;

    let config = llm_config("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 0);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.generate(&image_question()).await;

    assert!(matches!(result.as_deref(), Ok("")));
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_mock = Arc::clone(&attempts);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(move |_request: &Request| {
            if attempts_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(500).set_body_string("upstream temporary failure")
            } else {
                ResponseTemplate::new(200)
                    .set_body_json(completion_body(Some("Recovered response")))
            }
        })
        .mount(&server)
        .await;

    let config = llm_config("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 2);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.generate(&image_question()).await;

    match result {
        Ok(value) => assert_eq!(value, "Recovered response"),
        Err(error) => panic!("Expected retry to succeed, got: {error}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_handling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(api_error_body(
                "Rate limit exceeded",
                "insufficient_quota",
                "insufficient_quota",
            )),
        )
        .mount(&server)
        .await;

    let config = llm_config("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 1);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.generate(&image_question()).await;

    assert!(matches!(
        result,
        Err(AppError::ModelRateLimit { retry_after: None })
    ));
}

#[tokio::test]
async fn test_auth_error_returns_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
            "Invalid API key",
            "invalid_request_error",
            "invalid_api_key",
        )))
        .mount(&server)
        .await;

    let config = llm_config("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 1);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.generate(&image_question()).await;

    match result {
        Err(AppError::Model(message)) => {
            assert!(message.to_lowercase().contains("authentication failed"));
        }
        other => panic!("Expected model auth error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unavailable_provider_fails_fast() {
    let provider = LlmProvider::new(None);

    let result = provider.generate(&image_question()).await;

    assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
}
