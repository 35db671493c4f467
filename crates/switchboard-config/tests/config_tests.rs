// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and merging.

use switchboard_config::{load_config_from_str, ProviderKind};

const SAMPLE: &str = r#"
[defaults]
cost_weight = 0.6
quality_weight = 0.4
fallback_model = "haiku"

[tiers.premium]
description = "Best quality"
models = ["opus", "sonnet"]

[tiers.speed]
models = ["haiku", "qwen-fast"]

[failover.speed]
chain = ["haiku", "qwen-fast"]

[failover.premium]
chain = ["opus", "sonnet", "haiku"]
retry_on = [429, 503]

[models.opus]
provider = "anthropic"
api_model = "claude-opus-4-20250514"
strengths = ["code", "architecture"]
cost_per_1k_tokens = 0.015
quality_ceiling = 0.98
max_context = 200000

[models.haiku]
provider = "anthropic"
api_model = "claude-haiku-4-5-20250901"
strengths = ["chat", "summarization"]
cost_per_1k_tokens = 0.001
quality_ceiling = 0.80
max_context = 200000
prompt_suffix = "Be concise."

[models.qwen-fast]
provider = "openai_compat"
api_model = "qwen-2.5-coder"
base_url = "https://api.cerebras.ai/v1"
strengths = ["code", "chat"]
cost_per_1k_tokens = 0.0002
quality_ceiling = 0.75
max_context = 32768

[models.local-llama]
provider = "ollama"
api_model = "llama3.2"
base_url = "http://localhost:11434"
strengths = ["chat"]
cost_per_1k_tokens = 0.0
quality_ceiling = 0.6
max_context = 8192

[tasks.summarization]
patterns = ["summariz", "tl;dr", "condense"]
required_strengths = ["summarization"]
min_quality = 0.5

[tasks.code]
patterns = ["write.*function", "implement", "debug"]
required_strengths = ["code"]
min_quality = 0.85

[route_classes.compaction]
description = "Context compaction"
default_tier = "speed"
latency_budget_ms = 10000
quality_floor = 0.5

[route_classes.compaction.detection]
headers = ["compact"]
content_patterns = ["summarize this conversation"]

[route_classes.interactive]
default_tier = "premium"
latency_budget_ms = 3000
quality_floor = 0.8

[server]
port = 9000
log_level = "debug"
"#;

#[test]
fn full_sample_parses() {
    let cfg = load_config_from_str(SAMPLE).unwrap();

    assert_eq!(cfg.defaults.fallback_model, "haiku");
    assert_eq!(cfg.models.len(), 4);
    assert_eq!(cfg.tiers.len(), 2);
    assert_eq!(cfg.tasks.len(), 2);
    assert_eq!(cfg.route_classes.len(), 2);
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.log_level, "debug");
    // host falls back to the compiled default.
    assert_eq!(cfg.server.host, "127.0.0.1");
}

#[test]
fn model_fields_deserialize() {
    let cfg = load_config_from_str(SAMPLE).unwrap();

    let opus = cfg.model("opus").unwrap();
    assert_eq!(opus.provider, ProviderKind::Anthropic);
    assert_eq!(opus.api_model, "claude-opus-4-20250514");
    assert!(opus.base_url.is_none());
    assert!(opus.prompt_suffix.is_none());

    let qwen = cfg.model("qwen-fast").unwrap();
    assert_eq!(qwen.provider, ProviderKind::OpenaiCompat);
    assert_eq!(qwen.base_url.as_deref(), Some("https://api.cerebras.ai/v1"));

    let llama = cfg.model("local-llama").unwrap();
    assert_eq!(llama.provider, ProviderKind::Ollama);
    assert!((llama.cost_per_1k_tokens - 0.0).abs() < f64::EPSILON);

    let haiku = cfg.model("haiku").unwrap();
    assert_eq!(haiku.prompt_suffix.as_deref(), Some("Be concise."));
}

#[test]
fn failover_specs_deserialize() {
    let cfg = load_config_from_str(SAMPLE).unwrap();

    assert_eq!(cfg.failover_chain("speed"), vec!["haiku", "qwen-fast"]);
    assert_eq!(cfg.failover["premium"].retry_on, vec![429, 503]);
    assert!(cfg.failover["speed"].retry_on.is_empty());

    // Unknown tier falls back to the global fallback model.
    assert_eq!(cfg.failover_chain("free"), vec!["haiku"]);
}

#[test]
fn route_class_detection_deserializes() {
    let cfg = load_config_from_str(SAMPLE).unwrap();

    let compaction = &cfg.route_classes["compaction"];
    assert_eq!(compaction.default_tier, "speed");
    assert_eq!(compaction.detection.headers, vec!["compact"]);
    assert_eq!(
        compaction.detection.content_patterns,
        vec!["summarize this conversation"]
    );
    assert!((compaction.quality_floor - 0.5).abs() < f64::EPSILON);

    let interactive = &cfg.route_classes["interactive"];
    assert!(interactive.detection.headers.is_empty());
    assert_eq!(interactive.latency_budget_ms, 3000);
}

#[test]
fn empty_config_is_all_defaults() {
    let cfg = load_config_from_str("").unwrap();
    assert!(cfg.models.is_empty());
    assert!(cfg.route_classes.is_empty());
    assert_eq!(cfg.server.port, 8889);
    assert!((cfg.defaults.cost_weight - 0.6).abs() < f64::EPSILON);
}

#[test]
fn unknown_keys_are_rejected() {
    let result = load_config_from_str("[defaults]\nnot_a_real_key = 1\n");
    assert!(result.is_err());
}
