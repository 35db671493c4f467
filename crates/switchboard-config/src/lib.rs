// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Switchboard proxy: the model catalog, tiers,
//! failover chains, task and route-class detection specs, and scoring
//! weights -- plus the TOML loader that produces an immutable snapshot.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    Defaults, Detection, FailoverSpec, Model, ProviderKind, RouteClass, RouterConfig,
    ServerConfig, TaskSpec, TelemetryConfig, Tier,
};
