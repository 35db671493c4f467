// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Non-streaming body translation into the Anthropic response format.

use serde::Deserialize;
use switchboard_core::{AnthropicResponse, SwitchboardError, TextBlock, Usage};

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: String,
}

#[derive(Default, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Default, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// `"msg_"` plus the first eight characters of the event id.
pub(crate) fn message_id(event_id: &str) -> String {
    let short: String = event_id.chars().take(8).collect();
    format!("msg_{short}")
}

fn parse_error(e: impl std::error::Error + Send + Sync + 'static) -> SwitchboardError {
    SwitchboardError::Provider {
        message: format!("failed to parse provider response: {e}"),
        source: Some(Box::new(e)),
    }
}

fn assemble(
    event_id: &str,
    model: &str,
    text: String,
    input_tokens: u32,
    output_tokens: u32,
) -> AnthropicResponse {
    AnthropicResponse {
        id: message_id(event_id),
        kind: "message".to_string(),
        role: "assistant".to_string(),
        content: vec![TextBlock::text(text)],
        model: model.to_string(),
        stop_reason: "end_turn".to_string(),
        stop_sequence: None,
        usage: Usage {
            input_tokens,
            output_tokens,
        },
    }
}

/// Converts a non-streaming OpenAI chat completions body.
pub fn openai_body_to_anthropic(
    body: &[u8],
    event_id: &str,
    model: &str,
) -> Result<AnthropicResponse, SwitchboardError> {
    let parsed: OpenAiResponse = serde_json::from_slice(body).map_err(parse_error)?;
    let choice = parsed.choices.first().ok_or_else(|| SwitchboardError::Provider {
        message: "failed to parse provider response: no choices".to_string(),
        source: None,
    })?;

    Ok(assemble(
        event_id,
        model,
        choice.message.content.clone(),
        parsed.usage.prompt_tokens,
        parsed.usage.completion_tokens,
    ))
}

/// Converts a non-streaming Ollama /api/chat body.
pub fn ollama_body_to_anthropic(
    body: &[u8],
    event_id: &str,
    model: &str,
) -> Result<AnthropicResponse, SwitchboardError> {
    let parsed: OllamaResponse = serde_json::from_slice(body).map_err(parse_error)?;
    Ok(assemble(
        event_id,
        model,
        parsed.message.content,
        parsed.prompt_eval_count,
        parsed.eval_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_ID: &str = "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9";

    #[test]
    fn message_id_uses_first_eight_chars() {
        assert_eq!(message_id(EVENT_ID), "msg_0a1b2c3d");
        assert_eq!(message_id("short"), "msg_short");
    }

    #[test]
    fn openai_body_translates() {
        let body = br#"{
            "choices": [{"message": {"content": "Hello there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7}
        }"#;
        let resp = openai_body_to_anthropic(body, EVENT_ID, "gpt-test").unwrap();

        assert_eq!(resp.id, "msg_0a1b2c3d");
        assert_eq!(resp.kind, "message");
        assert_eq!(resp.role, "assistant");
        assert_eq!(resp.model, "gpt-test");
        assert_eq!(resp.stop_reason, "end_turn");
        assert_eq!(resp.content.len(), 1);
        assert_eq!(resp.content[0].text, "Hello there");
        assert_eq!(resp.usage.input_tokens, 12);
        assert_eq!(resp.usage.output_tokens, 7);
    }

    #[test]
    fn openai_body_without_choices_is_an_error() {
        let body = br#"{"choices": [], "usage": {}}"#;
        let err = openai_body_to_anthropic(body, EVENT_ID, "m").unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn openai_body_invalid_json_is_an_error() {
        assert!(openai_body_to_anthropic(b"garbage", EVENT_ID, "m").is_err());
    }

    #[test]
    fn ollama_body_translates_with_token_counts() {
        let body = br#"{
            "message": {"role": "assistant", "content": "Hi from llama"},
            "prompt_eval_count": 20,
            "eval_count": 9,
            "done": true
        }"#;
        let resp = ollama_body_to_anthropic(body, EVENT_ID, "llama3.2").unwrap();

        assert_eq!(resp.content[0].text, "Hi from llama");
        assert_eq!(resp.usage.input_tokens, 20);
        assert_eq!(resp.usage.output_tokens, 9);
        assert_eq!(resp.model, "llama3.2");
    }

    #[test]
    fn ollama_body_missing_fields_defaults() {
        let body = br#"{"message": {"content": "x"}}"#;
        let resp = ollama_body_to_anthropic(body, EVENT_ID, "m").unwrap();
        assert_eq!(resp.usage.input_tokens, 0);
        assert_eq!(resp.usage.output_tokens, 0);
    }
}
