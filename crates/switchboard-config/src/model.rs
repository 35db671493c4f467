// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard proxy.
//!
//! All keyed sections (models, tiers, tasks, route classes, failover chains)
//! use `BTreeMap` so that iteration order is always the sorted key order.
//! Classification and routing walk these maps directly, so the map choice is
//! what makes repeated requests deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML following the XDG hierarchy, with `SWITCHBOARD_`
/// environment variable overrides. Immutable for the process lifetime.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Scoring weights and the global fallback model.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named model groups (premium / budget / speed / free).
    #[serde(default)]
    pub tiers: BTreeMap<String, Tier>,

    /// Per-tier ordered failover chains.
    #[serde(default)]
    pub failover: BTreeMap<String, FailoverSpec>,

    /// The model catalog.
    #[serde(default)]
    pub models: BTreeMap<String, Model>,

    /// Task detection specs (patterns, required strengths, quality minimum).
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSpec>,

    /// Route-class detection specs (header tokens, content patterns).
    #[serde(default)]
    pub route_classes: BTreeMap<String, RouteClass>,

    /// Proxy server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telemetry store settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Scoring weights and global fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Minimum quality used when nothing else specifies one.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Weight of the (inverted, normalized) cost term in model scoring.
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,

    /// Weight of the quality-ceiling term in model scoring.
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f64,

    /// Model of last resort, appended to every failover chain.
    #[serde(default)]
    pub fallback_model: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            cost_weight: default_cost_weight(),
            quality_weight: default_quality_weight(),
            fallback_model: String::new(),
        }
    }
}

fn default_quality_threshold() -> f64 {
    0.7
}

fn default_cost_weight() -> f64 {
    0.6
}

fn default_quality_weight() -> f64 {
    0.4
}

/// A named group of models.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub models: Vec<String>,
}

/// Per-tier failover behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FailoverSpec {
    /// Ordered model names to try after the routed selection fails.
    #[serde(default)]
    pub chain: Vec<String>,

    /// HTTP statuses that advance the chain for this tier. Empty means the
    /// built-in set: 401, 403, 429 and all 5xx.
    #[serde(default)]
    pub retry_on: Vec<u16>,

    /// Upper bound on attempts; zero means the full chain.
    #[serde(default)]
    pub max_retries: u32,
}

/// One entry in the model catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
    /// Which backend wire shape this model speaks.
    pub provider: ProviderKind,

    /// The model name sent on the wire (may differ from the catalog key).
    pub api_model: String,

    /// Endpoint base URL. Required for openai_compat and ollama; for
    /// anthropic it overrides the public API endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Capability tags this model claims (code, architecture, ...).
    #[serde(default)]
    pub strengths: Vec<String>,

    /// Capability tags this model is known to be weak at.
    #[serde(default)]
    pub weaknesses: Vec<String>,

    /// Cost per 1k tokens in USD.
    #[serde(default)]
    pub cost_per_1k_tokens: f64,

    /// Typical response latency.
    #[serde(default)]
    pub avg_latency_ms: u32,

    /// Upper bound on output quality in [0, 1].
    #[serde(default)]
    pub quality_ceiling: f64,

    /// Maximum context window in tokens.
    #[serde(default)]
    pub max_context: u32,

    /// Text appended to the system prompt to normalize output style.
    #[serde(default)]
    pub prompt_suffix: Option<String>,
}

/// Backend wire shapes understood by the provider adapters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    /// The Anthropic Messages API.
    Anthropic,
    /// Any OpenAI-compatible chat/completions endpoint.
    OpenaiCompat,
    /// A local Ollama /api/chat endpoint.
    Ollama,
}

/// Task detection spec.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    /// Regex patterns, compiled case-insensitively by the classifier.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Strengths a model must claim to be eligible for this task.
    #[serde(default)]
    pub required_strengths: Vec<String>,

    /// Minimum quality ceiling a model must meet for this task.
    #[serde(default)]
    pub min_quality: f64,
}

/// Route-class detection spec.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteClass {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub detection: Detection,

    /// Tier this class steers routing toward.
    #[serde(default)]
    pub default_tier: String,

    /// Informational latency budget; not enforced.
    #[serde(default)]
    pub latency_budget_ms: u32,

    /// Quality floor applied when no task matched.
    #[serde(default)]
    pub quality_floor: f64,
}

/// Detection rules for one route class.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Detection {
    /// Tokens matched against the `x-request-type` header value.
    #[serde(default)]
    pub headers: Vec<String>,

    /// Regex patterns matched against the prompt text.
    #[serde(default)]
    pub content_patterns: Vec<String>,

    /// Regex patterns matched against the system prompt. Accepted for
    /// config compatibility; route detection is header > content > default.
    #[serde(default)]
    pub system_prompt_patterns: Vec<String>,
}

/// Proxy server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When set, the proxy answers with mock responses describing the
    /// routing decision instead of calling providers.
    #[serde(default)]
    pub dry_run: bool,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dry_run: false,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8889
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    std::env::temp_dir()
        .join("switchboard-telemetry.db")
        .to_string_lossy()
        .into_owned()
}

impl RouterConfig {
    /// The ordered failover chain for a tier. Tiers without an explicit
    /// chain fall back to the global fallback model alone.
    pub fn failover_chain(&self, tier: &str) -> Vec<String> {
        match self.failover.get(tier) {
            Some(spec) => spec.chain.clone(),
            None => vec![self.defaults.fallback_model.clone()],
        }
    }

    /// The primary model list for a tier, or empty if the tier is unknown.
    pub fn tier_models(&self, tier: &str) -> Vec<String> {
        self.tiers
            .get(tier)
            .map(|t| t.models.clone())
            .unwrap_or_default()
    }

    /// Looks up a model by catalog name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }
}
