// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers: the /v1/messages orchestrator, health probes, and the
//! telemetry dashboard.
//!
//! The messages handler glues the pipeline together: parse → classify →
//! route → failover-execute → translate. The whole inbound body is buffered
//! up front because Anthropic-to-Anthropic passthrough re-patches the
//! original bytes per attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use switchboard_config::{ProviderKind, RouterConfig};
use switchboard_core::{
    strip_system_reminders, AnthropicRequest, AnthropicResponse, ErrorEnvelope, SwitchboardError,
    TextBlock, Usage,
};
use switchboard_providers::{
    FailoverEngine, ForwardedAuth, ProviderMessage, ProviderRequest, RequestContext,
};
use switchboard_router::{Classification, Classifier, ModelRouter, RoutingDecision};
use switchboard_telemetry::{Collector, RoutingEvent};
use tracing::{info, warn};
use uuid::Uuid;

use crate::stream;
use crate::translate;

/// Shared state for the axum handlers. Everything here is read-only or
/// internally synchronized, so clones are cheap and lock-free.
#[derive(Clone)]
pub struct ProxyState {
    pub cfg: Arc<RouterConfig>,
    pub classifier: Arc<Classifier>,
    pub router: Arc<ModelRouter>,
    pub failover: Arc<FailoverEngine>,
    pub telemetry: Option<Arc<Collector>>,
    /// Answer with mock routing decisions instead of calling providers.
    pub dry_run: bool,
}

/// POST /v1/messages -- the proxy's main entry point.
pub async fn handle_messages(
    State(state): State<ProxyState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "invalid_request_error",
            "Method not allowed".to_string(),
        );
    }

    let request: AnthropicRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                format!("Invalid JSON: {e}"),
            );
        }
    };

    if request.messages.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "messages is required".to_string(),
        );
    }

    // Text for classification: all user-turn text, harness reminders removed.
    let mut prompt_text = String::new();
    for message in &request.messages {
        if message.role == "user" {
            prompt_text.push_str(&message.content.flatten_text());
            prompt_text.push(' ');
        }
    }
    let prompt_text = strip_system_reminders(&prompt_text);

    let system_prompt = request
        .system
        .as_ref()
        .map(|s| s.flatten_text())
        .unwrap_or_default();

    let mut classifier_headers = HashMap::new();
    if let Some(request_type) = header_value(&headers, "x-request-type") {
        classifier_headers.insert("x-request-type".to_string(), request_type);
    }

    let classification = state.classifier.classify(&prompt_text, &classifier_headers);
    let decision = state.router.route(&classification);

    let event_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    info!(
        route_class = %classification.route_class,
        task_type = %classification.task_type,
        tier = %classification.tier,
        model = %decision.model,
        confidence = classification.confidence,
        "routing request"
    );

    if state.dry_run {
        record_telemetry(&state, &event_id, &classification, &decision, &decision.model, 0).await;
        return dry_run_response(&event_id, &classification, &decision);
    }

    let provider_request = ProviderRequest {
        system_prompt,
        messages: request
            .messages
            .iter()
            .map(|m| ProviderMessage {
                role: m.role.clone(),
                content: m.content.flatten_text(),
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        stream: request.stream,
        raw_anthropic_body: Some(body.clone()),
        auth: ForwardedAuth {
            x_api_key: header_value(&headers, "x-api-key"),
            authorization: header_value(&headers, "authorization"),
        },
    };

    let ctx = RequestContext {
        event_id: event_id.clone(),
    };

    let (upstream, used_model) = match state
        .failover
        .execute(&ctx, &decision, &provider_request)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            return error_response(
                StatusCode::BAD_GATEWAY,
                "api_error",
                format!("All providers failed: {e}"),
            );
        }
    };

    let latency_ms = start.elapsed().as_millis() as i64;
    record_telemetry(
        &state,
        &event_id,
        &classification,
        &decision,
        &used_model,
        latency_ms,
    )
    .await;

    // Non-retryable upstream errors surface to the client verbatim.
    if !upstream.status().is_success() {
        return forward_upstream(upstream).await;
    }

    let provider = state
        .cfg
        .model(&used_model)
        .map(|m| m.provider)
        .unwrap_or(ProviderKind::Anthropic);

    if request.stream {
        return match provider {
            ProviderKind::Anthropic => stream::stream_anthropic_passthrough(upstream),
            ProviderKind::OpenaiCompat => {
                stream::stream_openai_to_anthropic(upstream, event_id, used_model)
            }
            ProviderKind::Ollama => {
                stream::stream_ollama_to_anthropic(upstream, event_id, used_model)
            }
        };
    }

    let upstream_body = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read provider response body");
            return error_response(
                StatusCode::BAD_GATEWAY,
                "api_error",
                "Failed to read provider response".to_string(),
            );
        }
    };

    match provider {
        ProviderKind::Anthropic => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            upstream_body,
        )
            .into_response(),
        ProviderKind::OpenaiCompat => {
            translated_response(translate::openai_body_to_anthropic(
                &upstream_body,
                &event_id,
                &used_model,
            ))
        }
        ProviderKind::Ollama => translated_response(translate::ollama_body_to_anthropic(
            &upstream_body,
            &event_id,
            &used_model,
        )),
    }
}

/// GET /health, /healthz, and / -- liveness probe.
pub async fn handle_health(State(state): State<ProxyState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "service": "switchboard",
        "models": state.cfg.models.len(),
    }))
    .into_response()
}

/// GET /dashboard -- aggregate routing statistics.
pub async fn handle_dashboard(State(state): State<ProxyState>) -> Response {
    let Some(telemetry) = &state.telemetry else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "api_error",
            "Telemetry not available".to_string(),
        );
    };
    match telemetry.stats(None).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "api_error",
            format!("Failed to get stats: {e}"),
        ),
    }
}

/// Writes an Anthropic-format error envelope with the given status.
pub fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    (status, Json(ErrorEnvelope::new(error_type, message))).into_response()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Hands the upstream response back unchanged: status, content type, body.
async fn forward_upstream(upstream: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let body = upstream.bytes().await.unwrap_or_default();

    (status, [(header::CONTENT_TYPE, content_type)], Body::from(body)).into_response()
}

fn translated_response(result: Result<AnthropicResponse, SwitchboardError>) -> Response {
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            warn!(error = %e, "provider response translation failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                "api_error",
                "Failed to parse provider response".to_string(),
            )
        }
    }
}

async fn record_telemetry(
    state: &ProxyState,
    event_id: &str,
    classification: &Classification,
    decision: &RoutingDecision,
    used_model: &str,
    latency_ms: i64,
) {
    let Some(telemetry) = &state.telemetry else {
        return;
    };
    let event = RoutingEvent {
        id: event_id.to_string(),
        route_class: classification.route_class.clone(),
        task_type: classification.task_type.clone(),
        tier: classification.tier.clone(),
        selected_model: used_model.to_string(),
        alternatives: decision.alternatives.iter().map(|a| a.model.clone()).collect(),
        latency_ms,
        estimated_cost: decision.est_cost,
    };
    if let Err(e) = telemetry.record_routing(event).await {
        warn!(error = %e, "failed to record routing event");
    }
}

/// A mock response describing the routing decision, for `--dry-run` runs.
fn dry_run_response(
    event_id: &str,
    classification: &Classification,
    decision: &RoutingDecision,
) -> Response {
    let text = format!(
        "[dry-run] class={} task={} tier={} model={} score={:.2} reason={}",
        classification.route_class,
        classification.task_type,
        decision.tier,
        decision.model,
        decision.score,
        decision.reasoning,
    );
    let response = AnthropicResponse {
        id: translate::message_id(event_id),
        kind: "message".to_string(),
        role: "assistant".to_string(),
        content: vec![TextBlock::text(text)],
        model: decision.model.clone(),
        stop_reason: "end_turn".to_string(),
        stop_sequence: None,
        usage: Usage::default(),
    };
    Json(response).into_response()
}
