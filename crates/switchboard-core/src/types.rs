// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API wire types shared across the proxy.
//!
//! The inbound request is parsed leniently: message content can be a plain
//! string or an array of typed blocks, and unknown block types (tool_use,
//! tool_result, image, thinking, ...) are carried without failing the parse.
//! Rich blocks are never reconstructed from these types -- the raw request
//! bytes are forwarded for Anthropic-to-Anthropic passthrough instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// An inbound Anthropic Messages API request.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicRequest {
    /// Model requested by the client (replaced by routing).
    #[serde(default)]
    pub model: String,

    /// Maximum tokens to generate. Zero means "use the provider default".
    #[serde(default)]
    pub max_tokens: u32,

    /// Conversation turns.
    pub messages: Vec<InboundMessage>,

    /// System prompt -- plain string or array of typed blocks.
    #[serde(default)]
    pub system: Option<MessageContent>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Whether the client wants a streaming (SSE) response.
    #[serde(default)]
    pub stream: bool,
}

/// A single turn in an Anthropic conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Content -- plain string or array of typed blocks.
    pub content: MessageContent,
}

/// Message content -- either a plain string or an ordered block sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Array of typed content blocks.
    Blocks(Vec<ContentPiece>),
}

/// One typed block inside a content array.
///
/// Only the block type and any text payload are retained; all other fields
/// (tool inputs, image sources, ...) are ignored here because classification
/// only needs the text.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPiece {
    /// Block type, e.g. "text", "tool_use", "tool_result", "image".
    #[serde(rename = "type")]
    pub kind: String,
    /// Text payload for "text" blocks; empty otherwise.
    #[serde(default)]
    pub text: String,
}

impl MessageContent {
    /// Flattens the content to plain text by concatenating all text blocks.
    pub fn flatten_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text.as_str())
                .collect(),
        }
    }
}

/// The non-streaming Anthropic response returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<TextBlock>,
    pub model: String,
    pub stop_reason: String,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

/// A text content block in an outbound response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TextBlock {
    /// A block of `type: "text"` with the given payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Token usage carried in an Anthropic response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The Anthropic-format error envelope: `{type: "error", error: {type, message}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub error: ErrorDetail,
}

/// Error detail within an [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorEnvelope {
    /// Builds an envelope with the given error type and message.
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            error: ErrorDetail {
                kind: error_type.to_string(),
                message: message.into(),
            },
        }
    }
}

/// Matches `<system-reminder>...</system-reminder>` blocks injected into
/// prompts by agent harness hooks and plugins.
static SYSTEM_REMINDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<system-reminder>.*?</system-reminder>")
        .unwrap_or_else(|e| unreachable!("static pattern is valid: {e}"))
});

/// Removes `<system-reminder>` blocks and collapses the whitespace runs
/// they leave behind into single spaces.
///
/// Harness reminders would otherwise dominate pattern matching: a short user
/// question wrapped in a long reminder must classify by the question alone.
pub fn strip_system_reminders(s: &str) -> String {
    let stripped = SYSTEM_REMINDER_RE.replace_all(s, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
