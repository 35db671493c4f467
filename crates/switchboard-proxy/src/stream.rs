// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live stream translation into Anthropic server-sent events.
//!
//! Each translator pumps the upstream response through a channel-backed
//! body; every SSE frame is its own chunk, so the client sees it the moment
//! it is produced. When the client disconnects the receiver drops, the next
//! send fails, and the pump task stops -- which also cancels the upstream
//! read.

use std::convert::Infallible;
use std::io;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tracing::warn;

// --- Anthropic SSE event payloads -------------------------------------------

#[derive(Serialize)]
struct MessageStartEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    message: MessageStartPayload,
}

#[derive(Serialize)]
struct MessageStartPayload {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    role: &'static str,
    model: String,
    content: Vec<serde_json::Value>,
    usage: StreamUsage,
}

#[derive(Serialize)]
struct StreamUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Serialize)]
struct ContentBlockStartEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    index: u32,
    content_block: StreamTextBlock,
}

#[derive(Serialize)]
struct StreamTextBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Serialize)]
struct ContentBlockDeltaEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    index: u32,
    delta: TextDelta,
}

#[derive(Serialize)]
struct TextDelta {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Serialize)]
struct ContentBlockStopEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    index: u32,
}

#[derive(Serialize)]
struct MessageDeltaEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    delta: StopReasonDelta,
    usage: OutputUsage,
}

#[derive(Serialize)]
struct StopReasonDelta {
    stop_reason: &'static str,
}

#[derive(Serialize)]
struct OutputUsage {
    output_tokens: u32,
}

#[derive(Serialize)]
struct MessageStopEvent {
    #[serde(rename = "type")]
    kind: &'static str,
}

fn build_message_start(id: &str, model: &str) -> MessageStartEvent {
    MessageStartEvent {
        kind: "message_start",
        message: MessageStartPayload {
            id: id.to_string(),
            kind: "message",
            role: "assistant",
            model: model.to_string(),
            content: Vec::new(),
            usage: StreamUsage {
                input_tokens: 0,
                output_tokens: 0,
            },
        },
    }
}

fn build_content_block_start() -> ContentBlockStartEvent {
    ContentBlockStartEvent {
        kind: "content_block_start",
        index: 0,
        content_block: StreamTextBlock {
            kind: "text",
            text: String::new(),
        },
    }
}

fn build_content_block_delta(text: &str) -> ContentBlockDeltaEvent {
    ContentBlockDeltaEvent {
        kind: "content_block_delta",
        index: 0,
        delta: TextDelta {
            kind: "text_delta",
            text: text.to_string(),
        },
    }
}

fn build_message_delta(output_tokens: u32) -> MessageDeltaEvent {
    MessageDeltaEvent {
        kind: "message_delta",
        delta: StopReasonDelta {
            stop_reason: "end_turn",
        },
        usage: OutputUsage { output_tokens },
    }
}

// --- Upstream chunk shapes ---------------------------------------------------

/// One OpenAI streaming chunk, reduced to the fields the translator reads.
#[derive(Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: String,
}

/// One JSON line from an Ollama /api/chat streaming response.
#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Default, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

// --- Plumbing ----------------------------------------------------------------

type FrameSender = mpsc::Sender<Result<Bytes, Infallible>>;

/// Serializes one `event: <name>\ndata: <json>\n\n` frame.
fn sse_frame<T: Serialize>(event: &str, data: &T) -> Bytes {
    match serde_json::to_string(data) {
        Ok(json) => Bytes::from(format!("event: {event}\ndata: {json}\n\n")),
        // Best-effort comment frame so the client can see the failure.
        Err(e) => Bytes::from(format!(": serialize error: {e}\n\n")),
    }
}

/// Sends one frame; false means the client is gone.
async fn send_frame(tx: &FrameSender, frame: Bytes) -> bool {
    tx.send(Ok(frame)).await.is_ok()
}

/// message_start followed by content_block_start.
async fn emit_preamble(tx: &FrameSender, event_id: &str, model: &str) -> bool {
    send_frame(tx, sse_frame("message_start", &build_message_start(event_id, model))).await
        && send_frame(
            tx,
            sse_frame("content_block_start", &build_content_block_start()),
        )
        .await
}

/// content_block_stop, message_delta with the final token count, message_stop.
async fn emit_epilogue(tx: &FrameSender, output_tokens: u32) -> bool {
    send_frame(
        tx,
        sse_frame(
            "content_block_stop",
            &ContentBlockStopEvent {
                kind: "content_block_stop",
                index: 0,
            },
        ),
    )
    .await
        && send_frame(
            tx,
            sse_frame("message_delta", &build_message_delta(output_tokens)),
        )
        .await
        && send_frame(
            tx,
            sse_frame(
                "message_stop",
                &MessageStopEvent {
                    kind: "message_stop",
                },
            ),
        )
        .await
}

/// Wraps the frame channel in a streaming response with SSE headers.
fn sse_response(rx: mpsc::Receiver<Result<Bytes, Infallible>>) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

// --- Translators -------------------------------------------------------------

/// Copies Anthropic SSE from the upstream verbatim.
///
/// Lines accumulate in a buffer that is handed to the client whenever a
/// `data:` line lands, keeping latency low without splitting frames; any
/// trailing lines are sent when the upstream closes.
pub fn stream_anthropic_passthrough(upstream: reqwest::Response) -> Response {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        let reader = StreamReader::new(upstream.bytes_stream().map_err(io::Error::other));
        let mut lines = BufReader::new(reader).lines();
        let mut buffer = String::new();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let is_data = line.starts_with("data:");
                    buffer.push_str(&line);
                    buffer.push('\n');
                    if is_data && !send_frame(&tx, Bytes::from(std::mem::take(&mut buffer))).await
                    {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "upstream read failed during passthrough");
                    break;
                }
            }
        }

        if !buffer.is_empty() {
            let _ = tx.send(Ok(Bytes::from(buffer))).await;
        }
    });

    sse_response(rx)
}

/// Translates OpenAI-format SSE into Anthropic SSE events.
///
/// Every chunk with delta content becomes a `content_block_delta`;
/// `data: [DONE]` ends the stream. Malformed chunks are skipped. The
/// epilogue reports zero output tokens because the upstream does not
/// surface a count on the stream.
pub fn stream_openai_to_anthropic(
    upstream: reqwest::Response,
    event_id: String,
    model: String,
) -> Response {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        if !emit_preamble(&tx, &event_id, &model).await {
            return;
        }

        let mut events = upstream.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "upstream SSE error, ending stream");
                    break;
                }
            };

            let data = event.data.trim();
            if data == "[DONE]" {
                break;
            }
            let Ok(chunk) = serde_json::from_str::<OpenAiChunk>(data) else {
                continue;
            };

            for choice in &chunk.choices {
                if choice.delta.content.is_empty() {
                    continue;
                }
                let frame = sse_frame(
                    "content_block_delta",
                    &build_content_block_delta(&choice.delta.content),
                );
                if !send_frame(&tx, frame).await {
                    return;
                }
            }
        }

        emit_epilogue(&tx, 0).await;
    });

    sse_response(rx)
}

/// Translates Ollama's newline-delimited JSON into Anthropic SSE events.
///
/// The terminal object (`done: true`) carries `eval_count`, forwarded as
/// the final output-token count in `message_delta`.
pub fn stream_ollama_to_anthropic(
    upstream: reqwest::Response,
    event_id: String,
    model: String,
) -> Response {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        if !emit_preamble(&tx, &event_id, &model).await {
            return;
        }

        let reader = StreamReader::new(upstream.bytes_stream().map_err(io::Error::other));
        let mut lines = BufReader::new(reader).lines();
        let mut output_tokens = 0;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    let Ok(chunk) = serde_json::from_str::<OllamaChunk>(&line) else {
                        continue;
                    };
                    if chunk.done {
                        output_tokens = chunk.eval_count;
                        break;
                    }
                    if chunk.message.content.is_empty() {
                        continue;
                    }
                    let frame = sse_frame(
                        "content_block_delta",
                        &build_content_block_delta(&chunk.message.content),
                    );
                    if !send_frame(&tx, frame).await {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "upstream read failed during ollama stream");
                    break;
                }
            }
        }

        emit_epilogue(&tx, output_tokens).await;
    });

    sse_response(rx)
}
