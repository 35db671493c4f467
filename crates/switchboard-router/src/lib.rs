// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request classification and model routing for the Switchboard proxy.
//!
//! This crate provides:
//! - [`Classifier`]: two-layer pattern-based classification (route class,
//!   then task type) with all patterns compiled at construction
//! - [`ModelRouter`]: weighted cost/quality scoring over the model catalog,
//!   plus model-specific prompt-suffix injection
//!
//! Both are read-only after construction and safe to share across
//! concurrent request handlers without locking.

pub mod classifier;
pub mod router;

pub use classifier::{Classification, Classifier};
pub use router::{Alternative, ModelRouter, RoutingDecision};
