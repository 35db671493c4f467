// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proxy HTTP server built on axum.
//!
//! Wires the classifier, router, failover engine, and telemetry into the
//! shared handler state and serves the routes.

use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use switchboard_config::RouterConfig;
use switchboard_core::SwitchboardError;
use switchboard_providers::FailoverEngine;
use switchboard_router::{Classifier, ModelRouter};
use switchboard_telemetry::Collector;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{self, ProxyState};

/// The Switchboard proxy server.
pub struct ProxyServer {
    state: ProxyState,
    host: String,
    port: u16,
}

impl ProxyServer {
    /// Builds all pipeline pieces from the config.
    ///
    /// Telemetry opens the configured SQLite database; if that fails the
    /// proxy starts with telemetry disabled rather than refusing to serve.
    pub async fn new(cfg: Arc<RouterConfig>) -> Result<Self, SwitchboardError> {
        let classifier = Arc::new(Classifier::new(cfg.clone()));
        let router = Arc::new(ModelRouter::new(cfg.clone()));

        let telemetry = match Collector::open(&cfg.telemetry.database_path).await {
            Ok(collector) => Some(Arc::new(collector)),
            Err(e) => {
                warn!(error = %e, "telemetry disabled");
                None
            }
        };

        let failover = Arc::new(FailoverEngine::new(
            cfg.clone(),
            router.clone(),
            telemetry.clone(),
        )?);

        Ok(Self {
            state: ProxyState {
                classifier,
                router,
                failover,
                telemetry,
                dry_run: cfg.server.dry_run,
                cfg: cfg.clone(),
            },
            host: cfg.server.host.clone(),
            port: cfg.server.port,
        })
    }

    /// The axum application for the given state. Exposed so tests can drive
    /// the full router without binding a socket.
    pub fn app(state: ProxyState) -> Router {
        Router::new()
            .route("/v1/messages", any(handlers::handle_messages))
            .route("/health", get(handlers::handle_health))
            .route("/healthz", get(handlers::handle_health))
            .route("/dashboard", get(handlers::handle_dashboard))
            .route("/", get(handlers::handle_health))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Binds and serves until the server returns an error.
    pub async fn start(self) -> Result<(), SwitchboardError> {
        let address = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| SwitchboardError::Gateway {
                message: format!("failed to bind proxy to {address}: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!("switchboard proxy listening on {address}");
        info!("endpoint: http://{address}/v1/messages");

        let app = Self::app(self.state);
        axum::serve(listener, app)
            .await
            .map_err(|e| SwitchboardError::Gateway {
                message: format!("proxy server error: {e}"),
                source: Some(Box::new(e)),
            })
    }
}
