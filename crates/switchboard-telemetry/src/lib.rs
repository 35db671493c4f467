// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing-event telemetry for the Switchboard proxy.
//!
//! One SQLite-backed [`Collector`] records every routing decision, failover,
//! and user feedback, and serves the aggregate stats shown on the dashboard
//! endpoint and the `stats` CLI command.

pub mod collector;

pub use collector::{Collector, RoutingEvent, Stats};
