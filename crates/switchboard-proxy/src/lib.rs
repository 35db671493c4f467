// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Switchboard proxy server: an axum HTTP front end that speaks the
//! Anthropic Messages API to clients and transparently reroutes each
//! request to the cheapest qualified backend model.
//!
//! Responses always come back in Anthropic's format -- live streams
//! included. Each backend wire shape has its own stream translator; the
//! Anthropic-to-Anthropic path forwards upstream SSE verbatim.

pub mod handlers;
pub mod server;
pub mod stream;
pub mod translate;

pub use handlers::ProxyState;
pub use server::ProxyServer;
