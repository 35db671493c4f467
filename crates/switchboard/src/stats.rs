// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard stats` and `switchboard feedback` -- telemetry commands.

use switchboard_config::RouterConfig;
use switchboard_core::SwitchboardError;
use switchboard_telemetry::Collector;

/// `switchboard stats` -- print aggregate routing statistics.
pub async fn run_stats(cfg: &RouterConfig, model: Option<&str>) -> Result<(), SwitchboardError> {
    let collector = Collector::open(&cfg.telemetry.database_path).await?;
    let stats = collector.stats(model).await?;

    println!("Total Requests: {}", stats.total_requests);
    println!("Total Cost:     ${:.6}", stats.total_cost);
    println!("Failovers:      {}", stats.failover_count);

    if !stats.by_model.is_empty() {
        println!("\nBy Model:");
        for (name, count) in &stats.by_model {
            println!("  {name:<30} {count}");
        }
    }

    if !stats.by_tier.is_empty() {
        println!("\nBy Tier:");
        for (name, count) in &stats.by_tier {
            println!("  {name:<20} {count}");
        }
    }
    Ok(())
}

/// `switchboard feedback <event-id>` -- record a user rating for an event.
pub async fn run_feedback(
    cfg: &RouterConfig,
    event_id: &str,
    rating: i64,
    override_model: Option<&str>,
) -> Result<(), SwitchboardError> {
    if !(1..=5).contains(&rating) {
        return Err(SwitchboardError::Config(
            "--rating must be between 1 and 5".to_string(),
        ));
    }

    let collector = Collector::open(&cfg.telemetry.database_path).await?;
    collector
        .record_feedback(event_id, rating, override_model)
        .await?;

    match override_model {
        Some(model) => {
            println!("Feedback recorded for event {event_id} (rating: {rating}, override: {model})")
        }
        None => println!("Feedback recorded for event {event_id} (rating: {rating})"),
    }
    Ok(())
}
