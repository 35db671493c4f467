// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the proxy pipeline: parse → classify → route →
//! failover → translate, driven through the full axum router against
//! wiremock upstreams.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use switchboard_config::{load_config_from_str, RouterConfig};
use switchboard_providers::FailoverEngine;
use switchboard_proxy::{ProxyServer, ProxyState};
use switchboard_router::{Classifier, ModelRouter};
use switchboard_telemetry::Collector;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn state_for(cfg: RouterConfig, with_telemetry: bool, dry_run: bool) -> ProxyState {
    let cfg = Arc::new(cfg);
    let classifier = Arc::new(Classifier::new(cfg.clone()));
    let router = Arc::new(ModelRouter::new(cfg.clone()));
    let telemetry = if with_telemetry {
        Some(Arc::new(Collector::open_in_memory().await.unwrap()))
    } else {
        None
    };
    let failover =
        Arc::new(FailoverEngine::new(cfg.clone(), router.clone(), telemetry.clone()).unwrap());
    ProxyState {
        cfg,
        classifier,
        router,
        failover,
        telemetry,
        dry_run,
    }
}

fn two_openai_models(base_url: &str) -> RouterConfig {
    load_config_from_str(&format!(
        r#"
        [defaults]
        cost_weight = 0.6
        quality_weight = 0.4
        fallback_model = "model-b"

        [models.model-a]
        provider = "openai_compat"
        api_model = "gpt-a"
        base_url = "{base_url}"
        cost_per_1k_tokens = 0.001
        quality_ceiling = 0.8

        [models.model-b]
        provider = "openai_compat"
        api_model = "gpt-b"
        base_url = "{base_url}"
        cost_per_1k_tokens = 0.002
        quality_ceiling = 0.8
        "#
    ))
    .unwrap()
}

fn post_messages(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn non_post_method_gets_anthropic_shaped_405() {
    let state = state_for(RouterConfig::default(), false, false).await;
    let app = ProxyServer::app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/v1/messages")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn invalid_json_gets_400() {
    let state = state_for(RouterConfig::default(), false, false).await;
    let app = ProxyServer::app(state);

    let response = app.oneshot(post_messages("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid JSON"));
}

#[tokio::test]
async fn empty_messages_gets_400() {
    let state = state_for(RouterConfig::default(), false, false).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(r#"{"model":"m","max_tokens":10,"messages":[]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("messages is required"));
}

#[tokio::test]
async fn health_endpoints_report_model_count() {
    let cfg = two_openai_models("http://unused");
    let state = state_for(cfg, false, false).await;
    let app = ProxyServer::app(state);

    for uri in ["/health", "/healthz", "/"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "switchboard");
        assert_eq!(body["models"], 2);
    }
}

#[tokio::test]
async fn failover_on_429_serves_second_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("gpt-a"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("gpt-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "recovered"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state_for(two_openai_models(&server.uri()), true, false).await;
    let telemetry = state.telemetry.clone().unwrap();
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"client-model","max_tokens":64,"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["content"][0]["text"], "recovered");
    assert_eq!(body["model"], "model-b");
    assert_eq!(body["stop_reason"], "end_turn");
    assert!(body["id"].as_str().unwrap().starts_with("msg_"));
    assert_eq!(body["usage"]["output_tokens"], 2);

    // Exactly two backend calls, and the failover is attributed.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    let stats = telemetry.stats(None).await.unwrap();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.failover_count, 1);
    assert_eq!(stats.by_model["model-b"], 1);
}

#[tokio::test]
async fn exhausted_chain_returns_502() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let state = state_for(two_openai_models(&server.uri()), false, false).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"m","max_tokens":64,"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["type"], "api_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("exhausted"));
}

#[tokio::test]
async fn upstream_non_retryable_error_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"detail":"no such model upstream"}"#),
        )
        .mount(&server)
        .await;

    let state = state_for(two_openai_models(&server.uri()), false, false).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"m","max_tokens":64,"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, r#"{"detail":"no such model upstream"}"#);
    // The chain stops at the first non-retryable error.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn anthropic_raw_body_preserves_tool_result_blocks() {
    let server = MockServer::start().await;
    let upstream_json = serde_json::json!({
        "id": "msg_upstream",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "done"}],
        "model": "wire-model",
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 5, "output_tokens": 1}
    });
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&upstream_json))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = load_config_from_str(&format!(
        r#"
        [defaults]
        fallback_model = "claude-local"

        [models.claude-local]
        provider = "anthropic"
        api_model = "wire-model"
        base_url = "{}"
        cost_per_1k_tokens = 0.003
        quality_ceiling = 0.9
        "#,
        server.uri()
    ))
    .unwrap();

    let state = state_for(cfg, false, false).await;
    let app = ProxyServer::app(state);

    let inbound = r#"{
        "model": "client-model",
        "max_tokens": 128,
        "messages": [
            {"role": "user", "content": [
                {"type": "text", "text": "use the result"},
                {"type": "tool_result", "tool_use_id": "tu_9", "content": "tool output"}
            ]}
        ]
    }"#;

    let response = app.oneshot(post_messages(inbound)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The upstream response comes back untranslated.
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["id"], "msg_upstream");

    // The outbound body kept the tool_result block and got the wire model.
    let received = &server.received_requests().await.unwrap()[0];
    let outbound: serde_json::Value = serde_json::from_slice(&received.body).unwrap();
    assert_eq!(outbound["model"], "wire-model");
    assert_eq!(outbound["messages"][0]["content"][1]["type"], "tool_result");
    assert_eq!(outbound["messages"][0]["content"][1]["content"], "tool output");
    assert_eq!(outbound["max_tokens"], 128);
}

#[tokio::test]
async fn inbound_credentials_are_forwarded_to_anthropic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(wiremock::matchers::header("x-api-key", "client-key"))
        .and(wiremock::matchers::header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "msg_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = load_config_from_str(&format!(
        r#"
        [defaults]
        fallback_model = "claude-local"
        [models.claude-local]
        provider = "anthropic"
        api_model = "wire-model"
        base_url = "{}"
        quality_ceiling = 0.9
        cost_per_1k_tokens = 0.003
        "#,
        server.uri()
    ))
    .unwrap();

    let state = state_for(cfg, false, false).await;
    let app = ProxyServer::app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .header("x-api-key", "client-key")
        .header("authorization", "Bearer tok")
        .body(Body::from(
            r#"{"model":"m","max_tokens":16,"messages":[{"role":"user","content":"hi"}]}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openai_stream_translates_to_anthropic_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"index\":0}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\" world\"},\"index\":0}]}\n\n\
                     data: [DONE]\n\n",
                ),
        )
        .mount(&server)
        .await;

    let state = state_for(two_openai_models(&server.uri()), false, false).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"m","max_tokens":64,"stream":true,"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let body = body_string(response).await;
    for (earlier, later) in [
        ("event: message_start", "event: content_block_start"),
        ("event: content_block_start", "Hello"),
        ("Hello", " world"),
        (" world", "event: content_block_stop"),
        ("event: content_block_stop", "event: message_delta"),
        ("event: message_delta", "event: message_stop"),
    ] {
        let a = body.find(earlier).unwrap_or_else(|| panic!("missing {earlier:?}"));
        let b = body.find(later).unwrap_or_else(|| panic!("missing {later:?}"));
        assert!(a < b, "{earlier:?} should precede {later:?} in:\n{body}");
    }
}

#[tokio::test]
async fn ollama_stream_carries_eval_count_into_message_delta() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(
                    "{\"message\":{\"content\":\"Hello\"},\"done\":false}\n\
                     {\"message\":{\"content\":\" world\"},\"done\":false}\n\
                     {\"message\":{\"content\":\"\"},\"done\":true,\"eval_count\":42}\n",
                ),
        )
        .mount(&server)
        .await;

    let cfg = load_config_from_str(&format!(
        r#"
        [defaults]
        fallback_model = "local"
        [models.local]
        provider = "ollama"
        api_model = "llama3.2"
        base_url = "{}"
        quality_ceiling = 0.6
        cost_per_1k_tokens = 0.0
        "#,
        server.uri()
    ))
    .unwrap();

    let state = state_for(cfg, false, false).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"m","max_tokens":64,"stream":true,"messages":[{"role":"user","content":"hello"}]}"#,
        ))
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("Hello"));
    assert!(body.contains("\"output_tokens\":42"), "body:\n{body}");
}

#[tokio::test]
async fn summarization_prompt_routes_to_speed_tier() {
    let cfg = load_config_from_str(
        r#"
        [defaults]
        cost_weight = 0.6
        quality_weight = 0.4
        fallback_model = "speedy"

        [tiers.premium]
        models = ["big"]
        [tiers.speed]
        models = ["speedy"]

        [models.big]
        provider = "anthropic"
        api_model = "big-wire"
        strengths = ["code", "architecture"]
        cost_per_1k_tokens = 0.015
        quality_ceiling = 0.98

        [models.speedy]
        provider = "openai_compat"
        api_model = "speedy-wire"
        base_url = "http://unused"
        strengths = ["summarization", "chat"]
        cost_per_1k_tokens = 0.0002
        quality_ceiling = 0.75

        [tasks.summarization]
        patterns = ["summariz", "condense"]
        required_strengths = ["summarization"]
        min_quality = 0.5

        [route_classes.compaction]
        default_tier = "speed"
        quality_floor = 0.5
        [route_classes.compaction.detection]
        content_patterns = ["summarize this conversation"]

        [route_classes.interactive]
        default_tier = "premium"
        quality_floor = 0.8
        "#,
    )
    .unwrap();

    // Dry-run keeps the scenario offline: the response reports the decision.
    let state = state_for(cfg, false, true).await;
    let app = ProxyServer::app(state);

    let response = app
        .oneshot(post_messages(
            r#"{"model":"m","max_tokens":64,"messages":[{"role":"user","content":"Please summarize this conversation history"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    let text = body["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("class=compaction"), "got: {text}");
    assert!(text.contains("task=summarization"), "got: {text}");
    assert!(text.contains("tier=speed"), "got: {text}");
    assert!(text.contains("model=speedy"), "got: {text}");
}

#[tokio::test]
async fn request_type_header_overrides_content_detection() {
    let cfg = load_config_from_str(
        r#"
        [defaults]
        fallback_model = "speedy"

        [tiers.budget]
        models = ["speedy"]

        [models.speedy]
        provider = "openai_compat"
        api_model = "speedy-wire"
        base_url = "http://unused"
        strengths = ["summarization"]
        cost_per_1k_tokens = 0.0002
        quality_ceiling = 0.75

        [route_classes.background]
        default_tier = "budget"
        quality_floor = 0.5
        [route_classes.background.detection]
        headers = ["background", "batch"]

        [route_classes.compaction]
        default_tier = "speed"
        quality_floor = 0.5
        [route_classes.compaction.detection]
        content_patterns = ["summarize this conversation"]
        "#,
    )
    .unwrap();

    let state = state_for(cfg, false, true).await;
    let app = ProxyServer::app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .header("x-request-type", "background")
        .body(Body::from(
            r#"{"model":"m","max_tokens":16,"messages":[{"role":"user","content":"summarize this conversation"}]}"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    let text = body["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("class=background"), "got: {text}");
}

#[tokio::test]
async fn dashboard_serves_stats_and_503_without_telemetry() {
    let state = state_for(RouterConfig::default(), true, false).await;
    let telemetry = state.telemetry.clone().unwrap();
    telemetry
        .record_routing(switchboard_telemetry::RoutingEvent {
            id: "e1".into(),
            selected_model: "m".into(),
            estimated_cost: 0.001,
            ..Default::default()
        })
        .await
        .unwrap();

    let app = ProxyServer::app(state);
    let request = Request::builder()
        .uri("/dashboard")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["total_requests"], 1);

    let state = state_for(RouterConfig::default(), false, false).await;
    let app = ProxyServer::app(state);
    let request = Request::builder()
        .uri("/dashboard")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
