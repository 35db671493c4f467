// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` -- starts the transparent HTTP proxy.

use std::sync::Arc;

use switchboard_config::RouterConfig;
use switchboard_core::SwitchboardError;
use switchboard_proxy::ProxyServer;
use tracing_subscriber::EnvFilter;

/// Runs the proxy with optional CLI overrides for port and dry-run mode.
pub async fn run_serve(
    mut cfg: RouterConfig,
    port: Option<u16>,
    dry_run: bool,
) -> Result<(), SwitchboardError> {
    init_tracing(&cfg.server.log_level);

    if let Some(port) = port {
        cfg.server.port = port;
    }
    if dry_run {
        cfg.server.dry_run = true;
    }

    let server = ProxyServer::new(Arc::new(cfg)).await?;
    server.start().await
}

/// Initializes the tracing subscriber from the configured log level.
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
