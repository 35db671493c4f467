// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cascading failover across the model chain for a routing decision.
//!
//! Every attempt is rebuilt from the pristine request: the suffix for the
//! attempted model is injected into a fresh copy of the system prompt, and
//! raw Anthropic bytes are re-patched from the original. An attempt must
//! never see decorations applied for an earlier attempt -- a second
//! Anthropic target after a failed first one would otherwise compound
//! suffixes.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use switchboard_config::{ProviderKind, RouterConfig};
use switchboard_core::SwitchboardError;
use switchboard_router::{ModelRouter, RoutingDecision};
use switchboard_telemetry::Collector;
use tracing::{info, warn};

use crate::adapter::ProviderDispatcher;
use crate::patch::patch_raw_body;
use crate::request::ProviderRequest;

/// Per-request context threaded through the engine, keying telemetry.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The request's event id (UUID v4), shared with the routing record.
    pub event_id: String,
}

/// Executes provider calls with cascading failover.
///
/// Records a failover event in telemetry when a model other than the chain
/// head ultimately serves the request.
pub struct FailoverEngine {
    cfg: Arc<RouterConfig>,
    router: Arc<ModelRouter>,
    telemetry: Option<Arc<Collector>>,
    dispatcher: ProviderDispatcher,
}

impl FailoverEngine {
    /// Wires the engine to the config, router (for suffix injection), and
    /// optional telemetry collector.
    pub fn new(
        cfg: Arc<RouterConfig>,
        router: Arc<ModelRouter>,
        telemetry: Option<Arc<Collector>>,
    ) -> Result<Self, SwitchboardError> {
        Ok(Self {
            cfg,
            router,
            telemetry,
            dispatcher: ProviderDispatcher::new()?,
        })
    }

    /// The attempt chain for a decision, deduplicated with order preserved:
    /// selected model, ranked alternatives, the tier's static chain, then
    /// the global fallback model.
    pub fn build_chain(&self, decision: &RoutingDecision) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();

        let mut push = |name: String, chain: &mut Vec<String>| {
            if !name.is_empty() && seen.insert(name.clone()) {
                chain.push(name);
            }
        };

        push(decision.model.clone(), &mut chain);
        for alt in &decision.alternatives {
            push(alt.model.clone(), &mut chain);
        }
        for name in self.cfg.failover_chain(&decision.tier) {
            push(name, &mut chain);
        }
        push(self.cfg.defaults.fallback_model.clone(), &mut chain);

        chain
    }

    /// Attempts each model in the chain in order and returns the first
    /// usable response together with the model that produced it.
    ///
    /// A call succeeds on a 2xx status. Retryable statuses and transport
    /// errors advance the chain; any other status is returned as-is so the
    /// caller can surface the upstream error verbatim. The response body is
    /// never consumed here -- the caller owns it.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        decision: &RoutingDecision,
        req: &ProviderRequest,
    ) -> Result<(reqwest::Response, String), SwitchboardError> {
        let chain = self.build_chain(decision);
        let chain_head = chain.first().cloned().unwrap_or_default();

        for model_name in &chain {
            let Some(model) = self.cfg.models.get(model_name) else {
                warn!(model = %model_name, "model not found in config, skipping");
                continue;
            };

            let attempt = self.build_attempt(model_name, model.provider, req);

            let response = match self.dispatcher.call(model, &attempt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(model = %model_name, error = %e, "provider call failed, trying next in chain");
                    continue;
                }
            };

            let status = response.status().as_u16();

            if response.status().is_success() {
                if *model_name != chain_head {
                    info!(from = %chain_head, to = %model_name, "request served after failover");
                    if let Some(telemetry) = &self.telemetry {
                        if let Err(e) = telemetry
                            .record_failover(&ctx.event_id, &chain_head, model_name)
                            .await
                        {
                            warn!(error = %e, "failed to record failover event");
                        }
                    }
                }
                return Ok((response, model_name.clone()));
            }

            if self.is_retryable(&decision.tier, status) {
                warn!(model = %model_name, status, "retryable status, trying next in chain");
                drop(response);
                continue;
            }

            // Non-retryable HTTP error (400, 404, ...) -- hand it back so the
            // client sees the upstream response verbatim.
            return Ok((response, model_name.clone()));
        }

        Err(SwitchboardError::Provider {
            message: format!("all models in {} chain exhausted", decision.tier),
            source: None,
        })
    }

    /// Builds the request for one attempt from the pristine inputs.
    fn build_attempt(
        &self,
        model_name: &str,
        provider: ProviderKind,
        req: &ProviderRequest,
    ) -> ProviderRequest {
        let mut attempt = req.clone();
        attempt.system_prompt = self.router.inject_suffix(model_name, &req.system_prompt);

        if provider == ProviderKind::Anthropic {
            if let Some(raw_body) = &req.raw_anthropic_body {
                let api_model = self
                    .cfg
                    .models
                    .get(model_name)
                    .map(|m| m.api_model.clone())
                    .unwrap_or_else(|| model_name.to_string());
                let suffix = self.router.suffix_for(model_name);
                match patch_raw_body(raw_body, &api_model, &suffix) {
                    Ok(patched) => attempt.raw_anthropic_body = Some(Bytes::from(patched)),
                    Err(e) => {
                        warn!(model = %model_name, error = %e, "raw body patch failed, using normalized request");
                        attempt.raw_anthropic_body = None;
                    }
                }
            }
        } else {
            // Only Anthropic targets can accept the raw Anthropic shape.
            attempt.raw_anthropic_body = None;
        }

        attempt
    }

    /// Whether a status advances the chain for this tier. Tiers may
    /// override the set via `retry_on`; the default treats auth errors,
    /// rate limits, and all server errors as reasons to try the next model.
    fn is_retryable(&self, tier: &str, status: u16) -> bool {
        if let Some(spec) = self.cfg.failover.get(tier) {
            if !spec.retry_on.is_empty() {
                return spec.retry_on.contains(&status);
            }
        }
        default_retryable(status)
    }
}

/// The built-in retryable set: 401, 403, 429 and all 5xx. Bad credentials
/// for one backend are treated as a reason to try another.
pub fn default_retryable(status: u16) -> bool {
    matches!(status, 401 | 403 | 429) || (500..=599).contains(&status)
}
