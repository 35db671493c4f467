// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only inspection commands: `route`, `classify`, `models`, and
//! `config init`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use switchboard_config::RouterConfig;
use switchboard_core::SwitchboardError;
use switchboard_router::{Classifier, ModelRouter};

/// `switchboard route <prompt>` -- classify, route, and print the decision.
pub fn run_route(
    cfg: &RouterConfig,
    prompt: &str,
    background: bool,
    interactive: bool,
) -> Result<(), SwitchboardError> {
    let cfg = Arc::new(cfg.clone());
    let classifier = Classifier::new(cfg.clone());
    let router = ModelRouter::new(cfg);

    let mut headers = HashMap::new();
    if background {
        headers.insert("x-request-type".to_string(), "background".to_string());
    }
    if interactive {
        headers.insert("x-request-type".to_string(), "chat".to_string());
    }

    let classification = classifier.classify(prompt, &headers);
    let decision = router.route(&classification);

    println!("Route Class:  {}", classification.route_class);
    println!("Task Type:    {}", classification.task_type);
    println!("Tier:         {}", decision.tier);
    println!("Model:        {}", decision.model);
    println!("Score:        {:.2}", decision.score);
    println!("Est. Cost:    ${:.4}/1k tokens", decision.est_cost);
    println!("Reasoning:    {}", decision.reasoning);
    if !decision.alternatives.is_empty() {
        let listed: Vec<String> = decision
            .alternatives
            .iter()
            .map(|a| format!("{} ({:.2})", a.model, a.score))
            .collect();
        println!("Alternatives: {}", listed.join(", "));
    }
    Ok(())
}

/// `switchboard classify <prompt>` -- classification only, no routing.
pub fn run_classify(cfg: &RouterConfig, prompt: &str) -> Result<(), SwitchboardError> {
    let classifier = Classifier::new(Arc::new(cfg.clone()));
    let classification = classifier.classify(prompt, &HashMap::new());

    println!("Route Class:       {}", classification.route_class);
    println!("Task Type:         {}", classification.task_type);
    println!("Tier:              {}", classification.tier);
    println!("Min Quality:       {:.2}", classification.min_quality);
    println!("Latency Budget:    {}ms", classification.latency_budget_ms);
    println!("Confidence:        {:.2}", classification.confidence);
    if !classification.required_strengths.is_empty() {
        println!(
            "Required Strengths: {}",
            classification.required_strengths.join(", ")
        );
    }
    Ok(())
}

/// `switchboard models` -- list the model catalog, optionally by tier.
pub fn run_models(cfg: &RouterConfig, tier: Option<&str>) -> Result<(), SwitchboardError> {
    let names: Vec<String> = match tier {
        Some(tier) => {
            let names = cfg.tier_models(tier);
            if names.is_empty() {
                return Err(SwitchboardError::Config(format!("unknown tier: {tier:?}")));
            }
            names
        }
        None => cfg.models.keys().cloned().collect(),
    };

    println!(
        "{:<30} {:<14} {:<10} {:<8} {}",
        "NAME", "PROVIDER", "COST/1K", "QUALITY", "STRENGTHS"
    );
    println!("{}", "-".repeat(90));
    for name in names {
        let Some(model) = cfg.model(&name) else {
            continue;
        };
        println!(
            "{:<30} {:<14} ${:<9.4} {:<8.2} {}",
            name,
            model.provider,
            model.cost_per_1k_tokens,
            model.quality_ceiling,
            model.strengths.join(", "),
        );
    }
    Ok(())
}

/// `switchboard config init` -- show which config files are considered.
pub fn run_config_init(explicit: &Option<PathBuf>) {
    if let Some(path) = explicit {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("File exists.");
        } else {
            println!("Warning: file does not exist.");
        }
        return;
    }

    let mut candidates = vec![PathBuf::from("/etc/switchboard/switchboard.toml")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("switchboard/switchboard.toml"));
    }
    candidates.push(PathBuf::from("switchboard.toml"));

    println!("Config files considered (later overrides earlier):");
    for candidate in candidates {
        let marker = if candidate.exists() { "found" } else { "absent" };
        println!("  [{marker}] {}", candidate.display());
    }
}
