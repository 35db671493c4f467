// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapters and cascading failover for the Switchboard proxy.
//!
//! Three backend wire shapes are supported: the Anthropic Messages API, any
//! OpenAI-compatible chat/completions endpoint, and Ollama's /api/chat.
//! Each shape owns its request builder; adding a fourth backend is one
//! [`switchboard_config::ProviderKind`] arm plus one stream translator in
//! the proxy crate.

pub mod adapter;
pub mod failover;
pub mod patch;
pub mod request;

pub use adapter::{resolve_api_key, ProviderDispatcher, ANTHROPIC_API_BASE};
pub use failover::{default_retryable, FailoverEngine, RequestContext};
pub use patch::patch_raw_body;
pub use request::{ForwardedAuth, ProviderMessage, ProviderRequest, DEFAULT_MAX_TOKENS};
