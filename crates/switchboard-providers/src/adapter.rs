// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapters for the three backend wire shapes.
//!
//! The dispatcher owns one connection-pooled client and builds the request
//! for whichever [`ProviderKind`] the model declares. Responses are returned
//! unconsumed -- the caller decides whether to stream, translate, or drop
//! the body.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use switchboard_config::{Model, ProviderKind};
use switchboard_core::SwitchboardError;

use crate::request::{anthropic_body, ollama_body, openai_compat_body, ProviderRequest};

/// Public Anthropic API base, used when a model has no `base_url` override.
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";

/// Pinned Anthropic API version token.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Issues provider calls for every backend shape.
#[derive(Debug, Clone)]
pub struct ProviderDispatcher {
    client: reqwest::Client,
}

impl ProviderDispatcher {
    pub fn new() -> Result<Self, SwitchboardError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SwitchboardError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Dispatches to the correct wire shape for `model`.
    ///
    /// When the request carries pre-patched raw Anthropic bytes and the
    /// target is an Anthropic backend, the bytes are forwarded verbatim.
    /// The returned response body is not consumed.
    pub async fn call(
        &self,
        model: &Model,
        req: &ProviderRequest,
    ) -> Result<reqwest::Response, SwitchboardError> {
        match model.provider {
            ProviderKind::Anthropic => match req.raw_anthropic_body.clone() {
                Some(raw_body) => self.call_anthropic_raw(model, req, raw_body).await,
                None => self.call_anthropic(model, req).await,
            },
            ProviderKind::OpenaiCompat => self.call_openai_compat(model, req).await,
            ProviderKind::Ollama => self.call_ollama(model, req).await,
        }
    }

    async fn call_anthropic(
        &self,
        model: &Model,
        req: &ProviderRequest,
    ) -> Result<reqwest::Response, SwitchboardError> {
        let body = anthropic_body(req, &model.api_model);
        let builder = self
            .client
            .post(anthropic_endpoint(model))
            .json(&body);
        self.send(anthropic_headers(builder, req), "anthropic").await
    }

    async fn call_anthropic_raw(
        &self,
        model: &Model,
        req: &ProviderRequest,
        raw_body: Bytes,
    ) -> Result<reqwest::Response, SwitchboardError> {
        let builder = self
            .client
            .post(anthropic_endpoint(model))
            .header(CONTENT_TYPE, "application/json")
            .body(raw_body);
        self.send(anthropic_headers(builder, req), "anthropic").await
    }

    async fn call_openai_compat(
        &self,
        model: &Model,
        req: &ProviderRequest,
    ) -> Result<reqwest::Response, SwitchboardError> {
        let base = model.base_url.as_deref().unwrap_or_default();
        let endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));
        let body = openai_compat_body(req, &model.api_model);

        let mut builder = self.client.post(endpoint).json(&body);
        let api_key = resolve_api_key(ProviderKind::OpenaiCompat, base);
        if !api_key.is_empty() {
            builder = builder.bearer_auth(api_key);
        }
        self.send(builder, "openai_compat").await
    }

    async fn call_ollama(
        &self,
        model: &Model,
        req: &ProviderRequest,
    ) -> Result<reqwest::Response, SwitchboardError> {
        let base = model.base_url.as_deref().unwrap_or_default();
        let endpoint = format!("{}/api/chat", base.trim_end_matches('/'));
        let body = ollama_body(req, &model.api_model);
        self.send(self.client.post(endpoint).json(&body), "ollama")
            .await
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        provider: &str,
    ) -> Result<reqwest::Response, SwitchboardError> {
        builder
            .send()
            .await
            .map_err(|e| SwitchboardError::Provider {
                message: format!("{provider} request failed: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

fn anthropic_endpoint(model: &Model) -> String {
    let base = model.base_url.as_deref().unwrap_or(ANTHROPIC_API_BASE);
    format!("{}/v1/messages", base.trim_end_matches('/'))
}

/// Attaches Anthropic auth headers: the forwarded client key when present,
/// else the environment key; forwarded `Authorization` rides along.
fn anthropic_headers(
    mut builder: reqwest::RequestBuilder,
    req: &ProviderRequest,
) -> reqwest::RequestBuilder {
    let api_key = req
        .auth
        .x_api_key
        .clone()
        .unwrap_or_else(|| resolve_api_key(ProviderKind::Anthropic, ""));
    builder = builder
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION);
    if let Some(authorization) = &req.auth.authorization {
        builder = builder.header(AUTHORIZATION, authorization);
    }
    builder
}

/// Resolves the API key environment variable for a provider. For
/// OpenAI-compatible backends the variable is picked by base-URL substring.
pub fn resolve_api_key(provider: ProviderKind, base_url: &str) -> String {
    match provider {
        ProviderKind::Anthropic => std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        ProviderKind::OpenaiCompat => {
            let lower = base_url.to_lowercase();
            let var = if lower.contains("minimax") {
                "MINIMAX_API_KEY"
            } else if lower.contains("cerebras") {
                "CEREBRAS_API_KEY"
            } else if lower.contains("groq") {
                "GROQ_API_KEY"
            } else {
                "OPENAI_API_KEY"
            };
            std::env::var(var).unwrap_or_default()
        }
        ProviderKind::Ollama => String::new(),
    }
}
