// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The normalized provider request and the per-backend wire bodies.
//!
//! The normalized form carries plain-text turns only. For Anthropic targets
//! the original request bytes travel alongside it so tool invocations,
//! tool results, images, and reasoning blocks survive the round trip -- the
//! normalized form is what every *other* backend shape can express.

use bytes::Bytes;
use serde::Serialize;

/// Token cap applied when the client sent none.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Inbound credentials forwarded to Anthropic backends.
#[derive(Debug, Clone, Default)]
pub struct ForwardedAuth {
    /// The client's `x-api-key` header, if present.
    pub x_api_key: Option<String>,
    /// The client's `Authorization` header, if present.
    pub authorization: Option<String>,
}

/// A normalized request that can be translated to any provider's wire
/// format.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// The pristine system prompt -- without any model suffix. The failover
    /// engine decorates a copy per attempt so suffixes never compound.
    pub system_prompt: String,
    pub messages: Vec<ProviderMessage>,
    /// Zero means "provider default" (see [`DEFAULT_MAX_TOKENS`]).
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub stream: bool,

    /// The original Anthropic request body. When set and the target is an
    /// Anthropic backend, these bytes are forwarded (patched) instead of
    /// the normalized form, preserving rich content blocks.
    pub raw_anthropic_body: Option<Bytes>,

    /// Credentials forwarded from the inbound request.
    pub auth: ForwardedAuth,
}

/// A single plain-text turn.
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// One `{role, content}` entry on the wire.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Anthropic Messages API request body (normalized path).
#[derive(Debug, Serialize)]
pub struct AnthropicBody<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// OpenAI-compatible chat/completions request body.
#[derive(Debug, Serialize)]
pub struct OpenAiCompatBody<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Ollama /api/chat request body.
#[derive(Debug, Serialize)]
pub struct OllamaBody<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub stream: bool,
    pub options: OllamaOptions,
}

/// Ollama generation options. The token cap travels as `num_predict`.
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    pub num_predict: u32,
}

fn effective_max_tokens(req: &ProviderRequest) -> u32 {
    if req.max_tokens == 0 {
        DEFAULT_MAX_TOKENS
    } else {
        req.max_tokens
    }
}

/// Builds the Anthropic body. `system` is included only when non-empty.
pub fn anthropic_body<'a>(req: &'a ProviderRequest, api_model: &'a str) -> AnthropicBody<'a> {
    AnthropicBody {
        model: api_model,
        max_tokens: effective_max_tokens(req),
        messages: wire_messages(req),
        stream: req.stream,
        system: (!req.system_prompt.is_empty()).then_some(req.system_prompt.as_str()),
        temperature: req.temperature,
    }
}

/// Builds the OpenAI-compatible body. The system prompt becomes the first
/// message with role "system".
pub fn openai_compat_body<'a>(
    req: &'a ProviderRequest,
    api_model: &'a str,
) -> OpenAiCompatBody<'a> {
    OpenAiCompatBody {
        model: api_model,
        max_tokens: effective_max_tokens(req),
        messages: wire_messages_with_system(req),
        stream: req.stream,
        temperature: req.temperature,
    }
}

/// Builds the Ollama body. The system prompt becomes the first message;
/// the token cap is expressed via `options.num_predict`.
pub fn ollama_body<'a>(req: &'a ProviderRequest, api_model: &'a str) -> OllamaBody<'a> {
    OllamaBody {
        model: api_model,
        messages: wire_messages_with_system(req),
        stream: req.stream,
        options: OllamaOptions {
            num_predict: effective_max_tokens(req),
        },
    }
}

fn wire_messages(req: &ProviderRequest) -> Vec<WireMessage<'_>> {
    req.messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str(),
            content: m.content.as_str(),
        })
        .collect()
}

fn wire_messages_with_system(req: &ProviderRequest) -> Vec<WireMessage<'_>> {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    if !req.system_prompt.is_empty() {
        messages.push(WireMessage {
            role: "system",
            content: req.system_prompt.as_str(),
        });
    }
    messages.extend(wire_messages(req));
    messages
}
