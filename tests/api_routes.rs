use axum::{
    body::{ to_bytes, Body },
    http::{ HeaderMap, Request, StatusCode },
    Router,
};
use httpmock::prelude::*;
use neuroexpert_api::config::prompt::PromptConfig;
use neuroexpert_api::config::{ Credentials, RuntimeEnv, Settings };
use neuroexpert_api::llm::chat::together::TogetherChatClient;
use neuroexpert_api::llm::chat::ProviderRegistry;
use neuroexpert_api::server::api::{ router, AppState };
use serde_json::{ json, Value };
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(settings: Settings, providers: ProviderRegistry) -> Router {
    let state = AppState::new(settings, PromptConfig::default(), providers).unwrap();
    router(state)
}

fn app() -> Router {
    app_with(Settings::default(), ProviderRegistry::default())
}

fn together_registry(server: &MockServer) -> ProviderRegistry {
    let mut registry = ProviderRegistry::default();
    let client = TogetherChatClient::new(
        "tg-key".into(),
        None,
        Some(server.base_url()),
        "You are the NeuroExpert assistant.".into()
    ).unwrap();
    registry.insert(Arc::new(client));
    registry
}

fn post_json(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("POST").uri(uri).header("content-type", "application/json")
}

fn ajax(uri: &str, body: Value) -> Request<Body> {
    post_json(uri)
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn health_carries_security_headers() {
    let resp = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(headers["permissions-policy"], "camera=(), microphone=(), geolocation=()");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn agents_list_returns_catalog() {
    let req = Request::builder().uri("/api/agents/list").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["agents"].as_array().unwrap().len(), 3);
    assert_eq!(body["agents"][0]["costPerHour"], 0.5);
}

#[tokio::test]
async fn post_without_origin_or_custom_header_is_forbidden() {
    let req = post_json("/api/balance/update")
        .body(Body::from(json!({ "amount": 5, "txHash": "0x1" }).to_string()))
        .unwrap();
    let (status, _, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn balance_update_without_amount_is_bad_request() {
    let (status, _, body) = send(app(), ajax("/api/balance/update", json!({ "txHash": "0xabc" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: amount");
}

#[tokio::test]
async fn balance_update_succeeds_with_required_fields() {
    let (status, _, body) = send(
        app(),
        ajax("/api/balance/update", json!({ "amount": 25.0, "txHash": "0xabc" }))
    ).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["newBalance"], 125.0);
    assert_eq!(body["txHash"], "0xabc");
    assert!(body["transactionId"].is_string());
}

#[tokio::test]
async fn unreadable_json_is_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/balance/update")
        .header("content-type", "application/json")
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

fn evil_origin_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/balance/update")
        .header("content-type", "application/json")
        .header("host", "host.example.com")
        .header("origin", "https://evil.example.com/host.example.com")
        .body(Body::from(json!({ "amount": 1, "txHash": "0x1" }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn substring_policy_lets_embedded_host_through() {
    let (status, _, _) = send(app(), evil_origin_request()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn strict_policy_blocks_embedded_host() {
    let settings = Settings { strict_origin_check: true, ..Default::default() };
    let (status, _, body) = send(app_with(settings, ProviderRegistry::default()), evil_origin_request()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid origin");
}

#[tokio::test]
async fn deactivate_rejects_non_numeric_id() {
    let (status, _, _) = send(app(), ajax("/api/agents/deactivate/abc", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(app(), ajax("/api/agents/deactivate/3", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["id"], 3);
    assert_eq!(body["agent"]["isActive"], false);
}

#[tokio::test]
async fn chat_without_providers_is_unavailable() {
    let (status, _, body) = send(app(), ajax("/api/chat", json!({ "message": "hi" }))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "No chat provider configured");
}

#[tokio::test]
async fn chat_rate_limit_kicks_in_after_ten_requests() {
    let app = app();
    for _ in 0..10 {
        let (status, _, _) = send(app.clone(), ajax("/api/chat", json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    let (status, headers, body) = send(app.clone(), ajax("/api/chat", json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers["x-ratelimit-limit"], "10");
    assert_eq!(headers["x-ratelimit-remaining"], "0");
    assert!(headers.contains_key("retry-after"));
    assert_eq!(body["error"], "Too many requests");
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn rate_limit_can_be_disabled() {
    let settings = Settings { rate_limit: false, ..Default::default() };
    let app = app_with(settings, ProviderRegistry::default());
    for _ in 0..12 {
        let (status, _, _) = send(app.clone(), ajax("/api/chat", json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn chat_proxies_through_configured_provider() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(
                r#"{ "messages": [
                    { "role": "system", "content": "You are the NeuroExpert assistant." },
                    { "role": "user", "content": "hi" }
                ] }"#
            );
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello there" } }]
        }));
    }).await;

    let app = app_with(Settings::default(), together_registry(&server));
    let (status, _, body) = send(app, ajax("/api/chat", json!({ "message": "hi" }))).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Hello there");
    assert_eq!(body["provider"], "together");
    assert_eq!(body["updatedHistory"].as_array().unwrap().len(), 3);
    assert_eq!(body["updatedHistory"][2]["role"], "assistant");
}

#[tokio::test]
async fn chat_surfaces_upstream_status_and_body() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429).body("slow down");
    }).await;

    let app = app_with(Settings::default(), together_registry(&server));
    let (status, _, body) = send(app, ajax("/api/chat", json!({ "message": "hi" }))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "together API error", "status": 429, "body": "slow down" }));
}

#[tokio::test]
async fn assistant_answers_in_demo_mode_without_providers() {
    let (status, _, body) = send(
        app(),
        ajax("/api/assistant", json!({ "question": "What is the price?" }))
    ).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "demo");
    assert!(body["answer"].as_str().unwrap().contains("39,900"));
    assert!(body["responseTime"].is_u64());
}

#[tokio::test]
async fn assistant_falls_back_to_apology_on_provider_failure() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(500).body("boom");
    }).await;

    let app = app_with(Settings::default(), together_registry(&server));
    let (status, _, body) = send(app, ajax("/api/assistant", json!({ "question": "hello" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "together");
    assert_eq!(body["answer"], PromptConfig::default().unavailable_message);
}

#[tokio::test]
async fn assistant_requires_question() {
    let (status, _, _) = send(app(), ajax("/api/assistant", json!({ "question": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_validates_rating_and_comment() {
    let app = app_with(Settings { rate_limit: false, ..Default::default() }, ProviderRegistry::default());

    let (status, _, body) = send(app.clone(), ajax("/api/feedback", json!({ "rating": 9 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid rating");

    let long = "x".repeat(1001);
    let (status, _, _) = send(
        app.clone(),
        ajax("/api/feedback", json!({ "rating": 4, "comment": long }))
    ).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _, body) = send(
        app.clone(),
        ajax("/api/feedback", json!({ "rating": "5", "comment": "great", "context": { "page": "/" } }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn oversized_feedback_body_is_rejected() {
    let padding = "y".repeat(17 * 1024);
    let (status, _, _) = send(app(), ajax("/api/feedback", json!({ "rating": 5, "context": { "pad": padding } }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

fn production(token: Option<&str>) -> Settings {
    Settings {
        env: RuntimeEnv {
            node_env: "production".into(),
            admin_debug_token: token.map(str::to_string),
            vercel_region: Some("fra1".into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn debug_endpoint_is_hidden_in_production_without_token() {
    let app = app_with(production(Some("s3cret")), ProviderRegistry::default());

    let req = Request::builder().uri("/api/debug").body(Body::empty()).unwrap();
    let (status, _, body) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));

    let req = Request::builder()
        .uri("/api/debug")
        .header("x-admin-debug-token", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = Request::builder()
        .uri("/api/debug")
        .header("x-admin-debug-token", "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["cache-control"], "no-store, max-age=0");
    assert_eq!(body["deployment"]["region"], "fra1");
    assert_eq!(body["deployment"]["gitCommit"], "unknown");
    assert!(body["telegramConfigured"].get("tokenLength").is_none());
}

#[tokio::test]
async fn debug_endpoint_without_configured_token_stays_hidden() {
    let app = app_with(production(None), ProviderRegistry::default());
    let req = Request::builder()
        .uri("/api/debug")
        .header("x-admin-debug-token", "")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_env_reports_lengths_without_key_material() {
    let settings = Settings {
        credentials: Credentials {
            gemini: Some("bogus-gemini-key".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let req = Request::builder().uri("/api/test-env").body(Body::empty()).unwrap();
    let (status, _, body) = send(app_with(settings, ProviderRegistry::default()), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["apiKeys"]["gemini"], json!({ "present": true, "length": 16, "validFormat": false }));
    assert!(!body.to_string().contains("bogus"));
    let recs = body["recommendations"].as_array().unwrap();
    assert!(recs.iter().any(|r| r.as_str().unwrap().contains("AIzaSy")));
}

#[tokio::test]
async fn check_openrouter_without_key_is_server_error() {
    let req = Request::builder().uri("/api/check-openrouter").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "No OpenRouter API key" }));
}

#[tokio::test]
async fn simple_test_reports_upstream_failure() {
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401).body("bad key");
    }).await;

    let app = app_with(Settings::default(), together_registry(&server));
    let req = Request::builder().uri("/api/simple-test").body(Body::empty()).unwrap();
    let (status, _, body) = send(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["provider"], "together");
    assert_eq!(body["status"], 401);
    assert_eq!(body["body"], "bad key");
}

#[tokio::test]
async fn telegram_notify_relays_api_verdict() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
        when.method(POST).path("/botbot-token/sendMessage").body_contains("New request");
        then.status(200).json_body(json!({ "ok": true }));
    }).await;

    let settings = Settings {
        credentials: Credentials {
            telegram_bot_token: Some("bot-token".into()),
            telegram_chat_id: Some("42".into()),
            ..Default::default()
        },
        telegram_api_base: server.base_url(),
        ..Default::default()
    };
    let (status, _, body) = send(
        app_with(settings, ProviderRegistry::default()),
        ajax("/api/telegram-notify", json!({ "type": "contact_form", "data": { "name": "Anna" } }))
    ).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn telegram_notify_without_credentials_reports_failure() {
    let (status, _, body) = send(
        app(),
        ajax("/api/telegram-notify", json!({ "type": "ai_chat", "data": {} }))
    ).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false }));
}

#[tokio::test]
async fn analytics_honours_date_range() {
    let req = Request::builder().uri("/api/analytics/google?dateRange=week").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dateRange"], "week");
    assert_eq!(body["demo"], true);

    let req = Request::builder().uri("/api/analytics/yandex").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["period"], "today");
}

#[tokio::test]
async fn uri_authority_replaces_missing_host_header() {
    let req = |origin: &str| {
        Request::builder()
            .method("POST")
            .uri("https://site.test/api/balance/update")
            .header("content-type", "application/json")
            .header("origin", origin)
            .body(Body::from(json!({ "amount": 5, "txHash": "0x1" }).to_string()))
            .unwrap()
    };

    let (status, _, body) = send(app(), req("https://site.test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, body) = send(app(), req("https://elsewhere.test")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid origin");
}

#[tokio::test]
async fn transaction_history_is_paginated() {
    let req = Request::builder().uri("/api/transactions/history").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["transactions"][0]["type"], "deposit");
    assert_eq!(body["transactions"][1]["agentId"], "agent-001");
    assert!(body["transactions"][1].get("txHash").is_none());
}

#[tokio::test]
async fn payment_verify_requires_payload() {
    let (status, _, body) = send(app(), ajax("/api/payment/verify", json!({ "txHash": "0xabc" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: payload");

    let (status, _, body) = send(
        app(),
        ajax("/api/payment/verify", json!({ "payload": { "sig": "0x01" }, "txHash": "0xabc" }))
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);
    assert_eq!(body["txHash"], "0xabc");
}

#[tokio::test]
async fn payment_status_requires_tx_hash() {
    let req = Request::builder().uri("/api/payment/verify").body(Body::empty()).unwrap();
    let (status, _, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: txHash");

    let req = Request::builder()
        .uri("/api/payment/verify?txHash=0xabc&chain=ethereum")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain"], "ethereum");
    assert_eq!(body["explorerUrl"], "https://etherscan.io/tx/0xabc");
}

fn with_telegram(server: &MockServer) -> Settings {
    Settings {
        credentials: Credentials {
            telegram_bot_token: Some("bot-token".into()),
            telegram_chat_id: Some("42".into()),
            ..Default::default()
        },
        telegram_api_base: server.base_url(),
        ..Default::default()
    }
}

async fn wait_for_hit(mock: &httpmock::Mock<'_>) {
    for _ in 0..50 {
        if mock.hits_async().await > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn assistant_reports_exchange_to_telegram() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
        when.method(POST)
            .path("/botbot-token/sendMessage")
            .body_contains("AI chat activity")
            .body_contains("What is the price?");
        then.status(200).json_body(json!({ "ok": true }));
    }).await;

    let app = app_with(with_telegram(&server), ProviderRegistry::default());
    let (status, _, body) = send(app, ajax("/api/assistant", json!({ "question": "What is the price?" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "demo");
    wait_for_hit(&mock).await;
}

#[tokio::test]
async fn feedback_is_forwarded_to_telegram() {
    let server = MockServer::start_async().await;
    let mock = server.mock_async(|when, then| {
        when.method(POST)
            .path("/botbot-token/sendMessage")
            .body_contains("New feedback")
            .body_contains("Rating: 4/5");
        then.status(200).json_body(json!({ "ok": true }));
    }).await;

    let app = app_with(with_telegram(&server), ProviderRegistry::default());
    let (status, _, body) = send(app, ajax("/api/feedback", json!({ "rating": 4, "comment": "handy" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    wait_for_hit(&mock).await;
}
