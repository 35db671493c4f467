// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weighted-scoring model selection and prompt-suffix injection.
//!
//! The router scores every configured model that survives the quality and
//! strength filters: `cost_weight * (1 - cost/max_cost) + quality_weight *
//! quality_ceiling`. Cheaper and better both raise the score; the weights
//! come from config so operators can trade cost against quality.

use std::cmp::Ordering;
use std::sync::Arc;

use switchboard_config::RouterConfig;

use crate::classifier::Classification;

/// The tier reported when the selected model belongs to no configured tier.
const FALLBACK_TIER: &str = "premium";

/// The router's output: the selected model, the reasoning behind the
/// choice, and ranked alternatives.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Catalog name of the selected model.
    pub model: String,
    /// The winning score.
    pub score: f64,
    /// First configured tier containing the selected model.
    pub tier: String,
    /// Human-readable reason for the selection.
    pub reasoning: String,
    /// Estimated cost per 1k tokens for the selected model.
    pub est_cost: f64,
    /// Qualified models that were not selected, best first.
    pub alternatives: Vec<Alternative>,
}

/// A model that qualified but was not selected.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub model: String,
    pub score: f64,
}

/// Scores eligible models and picks the best for a [`Classification`].
///
/// Read-only after construction; safe to share across request handlers.
pub struct ModelRouter {
    cfg: Arc<RouterConfig>,
}

impl ModelRouter {
    pub fn new(cfg: Arc<RouterConfig>) -> Self {
        Self { cfg }
    }

    /// Picks the best model across the whole catalog.
    ///
    /// Models below the classification's quality floor or missing a required
    /// strength are excluded before scoring. The tier is derived from the
    /// selected model's membership rather than predetermined by the route
    /// class. If nothing qualifies, the configured fallback model is
    /// returned with score zero.
    pub fn route(&self, class: &Classification) -> RoutingDecision {
        // Maximum cost across the catalog, for normalisation.
        let mut max_cost = self
            .cfg
            .models
            .values()
            .map(|m| m.cost_per_1k_tokens)
            .fold(0.0_f64, f64::max);
        if max_cost == 0.0 {
            max_cost = 1.0;
        }

        let mut candidates: Vec<(&str, f64)> = Vec::new();

        for (name, model) in &self.cfg.models {
            if model.quality_ceiling < class.min_quality {
                continue;
            }
            if !has_strengths(&model.strengths, &class.required_strengths) {
                continue;
            }

            let quality_score = model.quality_ceiling;
            let cost_score = 1.0 - (model.cost_per_1k_tokens / max_cost);
            let total = self.cfg.defaults.cost_weight * cost_score
                + self.cfg.defaults.quality_weight * quality_score;

            candidates.push((name.as_str(), total));
        }

        if candidates.is_empty() {
            return RoutingDecision {
                model: self.cfg.defaults.fallback_model.clone(),
                score: 0.0,
                tier: class.tier.clone(),
                reasoning: "no qualified models, using fallback".to_string(),
                est_cost: 0.0,
                alternatives: Vec::new(),
            };
        }

        // Descending by score; ties break by model name for determinism.
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let (best_name, best_score) = candidates[0];
        let alternatives = candidates[1..]
            .iter()
            .map(|(name, score)| Alternative {
                model: (*name).to_string(),
                score: *score,
            })
            .collect();

        let est_cost = self
            .cfg
            .models
            .get(best_name)
            .map(|m| m.cost_per_1k_tokens)
            .unwrap_or_default();

        RoutingDecision {
            model: best_name.to_string(),
            score: best_score,
            tier: self.find_model_tier(best_name),
            reasoning: format!("{} task → {} (cheapest qualified)", class.task_type, best_name),
            est_cost,
            alternatives,
        }
    }

    /// The first configured tier (in name order) containing the model, or
    /// "premium" when the model belongs to none.
    fn find_model_tier(&self, model_name: &str) -> String {
        for (tier_name, tier) in &self.cfg.tiers {
            if tier.models.iter().any(|m| m == model_name) {
                return tier_name.clone();
            }
        }
        FALLBACK_TIER.to_string()
    }

    /// Appends the model's prompt suffix to `system_prompt`, separated by a
    /// blank line. No suffix, or a blank suffix after trimming, returns the
    /// prompt unchanged; an empty prompt returns the suffix alone.
    pub fn inject_suffix(&self, model_name: &str, system_prompt: &str) -> String {
        let suffix = self.suffix_for(model_name);
        if suffix.is_empty() {
            return system_prompt.to_string();
        }
        if system_prompt.is_empty() {
            return suffix;
        }
        format!("{system_prompt}\n\n{suffix}")
    }

    /// The trimmed prompt suffix for a model, or empty if none is configured.
    pub fn suffix_for(&self, model_name: &str) -> String {
        self.cfg
            .models
            .get(model_name)
            .and_then(|m| m.prompt_suffix.as_deref())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

/// Whether `model_strengths` contains every element of `required`.
/// An empty requirement always passes.
fn has_strengths(model_strengths: &[String], required: &[String]) -> bool {
    required.iter().all(|r| model_strengths.contains(r))
}
