// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard proxy.
//!
//! This crate provides the shared error type and the Anthropic Messages API
//! wire types used by every other crate in the workspace.

pub mod error;
pub mod types;

pub use error::SwitchboardError;
pub use types::{
    strip_system_reminders, AnthropicRequest, AnthropicResponse, ErrorEnvelope, InboundMessage,
    MessageContent, TextBlock, Usage,
};
