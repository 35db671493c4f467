// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-layer request classification: route class, then task type.
//!
//! Layer 1 decides the coarse intent of the request (interactive /
//! background / compaction) from an explicit header or content patterns.
//! Layer 2 decides the fine-grained task (code, summarization, ...) by
//! counting pattern hits. All patterns are compiled once at construction so
//! `classify` is pure string matching with no allocation beyond the result.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use switchboard_config::RouterConfig;
use tracing::warn;

/// The route class assigned when nothing else matches.
const DEFAULT_ROUTE_CLASS: &str = "interactive";

/// The task type assigned when no task pattern matches.
const DEFAULT_TASK_TYPE: &str = "chat";

/// The two-layer classification result for one request.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Coarse intent: interactive, background, compaction, ...
    pub route_class: String,
    /// Fine-grained task: code, summarization, chat, ...
    pub task_type: String,
    /// The route class's default tier.
    pub tier: String,
    /// Quality floor models must meet: the matched task's minimum when a
    /// task matched, else the route class's floor.
    pub min_quality: f64,
    /// Informational latency budget from the route class.
    pub latency_budget_ms: u32,
    /// Strengths the matched task requires.
    pub required_strengths: Vec<String>,
    /// Classification confidence in [0, 1].
    pub confidence: f64,
}

/// Pre-compiled patterns for one route class.
struct CompiledRoutePatterns {
    content: Vec<Regex>,
}

/// Two-layer classifier with patterns compiled at construction.
///
/// Read-only after construction; safe to share across request handlers.
pub struct Classifier {
    cfg: Arc<RouterConfig>,
    task_patterns: BTreeMap<String, Vec<Regex>>,
    route_patterns: BTreeMap<String, CompiledRoutePatterns>,
}

impl Classifier {
    /// Compiles all task and route-class patterns from the config.
    ///
    /// Patterns compile case-insensitively. Invalid patterns are skipped
    /// with a warning rather than failing startup.
    pub fn new(cfg: Arc<RouterConfig>) -> Self {
        let mut task_patterns = BTreeMap::new();
        for (name, task) in &cfg.tasks {
            task_patterns.insert(name.clone(), compile_patterns(name, &task.patterns));
        }

        let mut route_patterns = BTreeMap::new();
        for (name, rc) in &cfg.route_classes {
            route_patterns.insert(
                name.clone(),
                CompiledRoutePatterns {
                    content: compile_patterns(name, &rc.detection.content_patterns),
                },
            );
        }

        Self {
            cfg,
            task_patterns,
            route_patterns,
        }
    }

    /// Runs the two-layer classification against the prompt and optional
    /// HTTP headers. Deterministic; no I/O.
    pub fn classify(&self, prompt: &str, headers: &HashMap<String, String>) -> Classification {
        let route_class = self.detect_route_class(prompt, headers);
        let (task_type, required_strengths, confidence) = self.detect_task_type(prompt);

        let rc = self.cfg.route_classes.get(&route_class);
        let tier = rc.map(|r| r.default_tier.clone()).unwrap_or_default();
        let latency_budget_ms = rc.map(|r| r.latency_budget_ms).unwrap_or_default();

        // The task's minimum drives model eligibility; the route-class floor
        // applies only when the classified task has no config entry. A
        // summarization prompt in an interactive session stays eligible for
        // cheap models -- the route class governs tier intent, not capability.
        let mut min_quality = rc.map(|r| r.quality_floor).unwrap_or_default();
        if let Some(task) = self.cfg.tasks.get(&task_type) {
            min_quality = task.min_quality;
        }

        Classification {
            route_class,
            task_type,
            tier,
            min_quality,
            latency_budget_ms,
            required_strengths,
            confidence,
        }
    }

    /// Three-priority route-class decision:
    /// 1. Explicit `x-request-type` header value matched against configured
    ///    header tokens.
    /// 2. Content patterns matched against the prompt text.
    /// 3. Default to "interactive".
    ///
    /// Classes are walked in name order, so overlapping patterns always
    /// resolve the same way.
    fn detect_route_class(&self, prompt: &str, headers: &HashMap<String, String>) -> String {
        if let Some(request_type) = headers.get("x-request-type") {
            for (name, rc) in &self.cfg.route_classes {
                if rc
                    .detection
                    .headers
                    .iter()
                    .any(|h| h.contains(request_type.as_str()))
                {
                    return name.clone();
                }
            }
        }

        for (name, crp) in &self.route_patterns {
            if crp.content.iter().any(|re| re.is_match(prompt)) {
                return name.clone();
            }
        }

        DEFAULT_ROUTE_CLASS.to_string()
    }

    /// Scans all task patterns and returns the task with the most hits,
    /// the strengths that task requires, and a confidence derived from the
    /// hit count. Ties resolve to the alphabetically earliest task.
    fn detect_task_type(&self, prompt: &str) -> (String, Vec<String>, f64) {
        let mut best_type = DEFAULT_TASK_TYPE.to_string();
        let mut best_count = 0usize;
        let mut best_strengths = Vec::new();

        for (name, patterns) in &self.task_patterns {
            let count = patterns.iter().filter(|re| re.is_match(prompt)).count();
            if count > best_count {
                best_count = count;
                best_type = name.clone();
                best_strengths = self
                    .cfg
                    .tasks
                    .get(name)
                    .map(|t| t.required_strengths.clone())
                    .unwrap_or_default();
            }
        }

        let confidence = match best_count {
            0 => 0.5,
            1 => 0.70,
            _ => 0.85,
        };

        (best_type, best_strengths, confidence)
    }
}

/// Compiles a pattern list case-insensitively, skipping invalid entries.
fn compile_patterns(owner: &str, patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| {
            match RegexBuilder::new(p).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(owner, pattern = %p, error = %e, "skipping invalid pattern");
                    None
                }
            }
        })
        .collect()
}
