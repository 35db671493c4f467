// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing-event telemetry backed by SQLite.
//!
//! Every routed request becomes one row in `routing_events`. Failover
//! attribution and the routing record arrive from different places (the
//! failover engine and the request handler) in no guaranteed order, so both
//! writes are upserts keyed by the event id. All operations are single
//! statements through tokio-rusqlite's background thread and are safe for
//! concurrent callers.

use std::collections::BTreeMap;

use serde::Serialize;
use switchboard_core::SwitchboardError;
use tracing::debug;

/// A single model-selection decision.
#[derive(Debug, Clone, Default)]
pub struct RoutingEvent {
    /// Event id (UUID v4), shared with the failover engine.
    pub id: String,
    pub route_class: String,
    pub task_type: String,
    pub tier: String,
    /// The model that ultimately served the request.
    pub selected_model: String,
    /// Ranked also-rans from the routing decision.
    pub alternatives: Vec<String>,
    pub latency_ms: i64,
    pub estimated_cost: f64,
}

/// Aggregate routing telemetry served by the dashboard endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub total_requests: i64,
    pub total_cost: f64,
    pub by_model: BTreeMap<String, i64>,
    pub by_tier: BTreeMap<String, i64>,
    pub failover_count: i64,
}

/// Records routing events and exposes aggregate stats via SQLite.
pub struct Collector {
    conn: tokio_rusqlite::Connection,
}

/// Convert a tokio-rusqlite error into SwitchboardError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}

impl Collector {
    /// Opens (or creates) the SQLite database at `path` and ensures the
    /// `routing_events` table exists.
    pub async fn open(path: &str) -> Result<Self, SwitchboardError> {
        let conn = tokio_rusqlite::Connection::open(path.to_owned())
            .await
            .map_err(map_tr_err)?;
        Self::with_connection(conn).await
    }

    /// Opens an in-memory database (tests and ephemeral runs).
    pub async fn open_in_memory() -> Result<Self, SwitchboardError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(map_tr_err)?;
        Self::with_connection(conn).await
    }

    async fn with_connection(
        conn: tokio_rusqlite::Connection,
    ) -> Result<Self, SwitchboardError> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS routing_events (
                    id TEXT PRIMARY KEY,
                    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                    route_class TEXT,
                    task_type TEXT,
                    tier TEXT,
                    selected_model TEXT,
                    alternatives TEXT,
                    latency_ms INTEGER,
                    estimated_cost REAL,
                    failover_from TEXT,
                    user_rating INTEGER,
                    user_override TEXT
                )",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// Records a routing decision. Upserts on the event id so a failover
    /// record that arrived first is preserved.
    pub async fn record_routing(&self, event: RoutingEvent) -> Result<(), SwitchboardError> {
        let alternatives =
            serde_json::to_string(&event.alternatives).unwrap_or_else(|_| "[]".to_string());

        debug!(
            id = %event.id,
            model = %event.selected_model,
            tier = %event.tier,
            latency_ms = event.latency_ms,
            "recording routing event"
        );

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO routing_events
                        (id, route_class, task_type, tier, selected_model,
                         alternatives, latency_ms, estimated_cost)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        route_class = excluded.route_class,
                        task_type = excluded.task_type,
                        tier = excluded.tier,
                        selected_model = excluded.selected_model,
                        alternatives = excluded.alternatives,
                        latency_ms = excluded.latency_ms,
                        estimated_cost = excluded.estimated_cost",
                    rusqlite::params![
                        event.id,
                        event.route_class,
                        event.task_type,
                        event.tier,
                        event.selected_model,
                        alternatives,
                        event.latency_ms,
                        event.estimated_cost,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Marks an event as served by `to_model` after failing over from
    /// `from_model`. Upserts so the later routing record cannot be lost.
    pub async fn record_failover(
        &self,
        event_id: &str,
        from_model: &str,
        to_model: &str,
    ) -> Result<(), SwitchboardError> {
        let event_id = event_id.to_string();
        let from_model = from_model.to_string();
        let to_model = to_model.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO routing_events (id, selected_model, failover_from)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET
                        failover_from = excluded.failover_from,
                        selected_model = excluded.selected_model",
                    rusqlite::params![event_id, to_model, from_model],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Stores a user-provided rating and optional preferred model.
    pub async fn record_feedback(
        &self,
        event_id: &str,
        rating: i64,
        override_model: Option<&str>,
    ) -> Result<(), SwitchboardError> {
        let event_id = event_id.to_string();
        let override_model = override_model.map(|s| s.to_string());

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE routing_events SET user_rating = ?1, user_override = ?2
                     WHERE id = ?3",
                    rusqlite::params![rating, override_model, event_id],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Aggregate stats. When `model_filter` is set, `total_requests` and
    /// `total_cost` are scoped to that model; the breakdowns and failover
    /// count always cover all events.
    pub async fn stats(&self, model_filter: Option<&str>) -> Result<Stats, SwitchboardError> {
        let model_filter = model_filter.map(|s| s.to_string());

        self.conn
            .call(move |conn| {
                let (total_requests, total_cost) = match &model_filter {
                    Some(model) => conn.query_row(
                        "SELECT COUNT(*), COALESCE(SUM(estimated_cost), 0)
                         FROM routing_events WHERE selected_model = ?1",
                        rusqlite::params![model],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
                    )?,
                    None => conn.query_row(
                        "SELECT COUNT(*), COALESCE(SUM(estimated_cost), 0)
                         FROM routing_events",
                        [],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
                    )?,
                };

                let mut by_model = BTreeMap::new();
                {
                    let mut stmt = conn.prepare(
                        "SELECT selected_model, COUNT(*) FROM routing_events
                         GROUP BY selected_model",
                    )?;
                    let rows = stmt.query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?;
                    for row in rows {
                        let (model, count) = row?;
                        by_model.insert(model, count);
                    }
                }

                let mut by_tier = BTreeMap::new();
                {
                    let mut stmt = conn.prepare(
                        "SELECT COALESCE(tier, ''), COUNT(*) FROM routing_events
                         GROUP BY tier",
                    )?;
                    let rows = stmt.query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?;
                    for row in rows {
                        let (tier, count) = row?;
                        by_tier.insert(tier, count);
                    }
                }

                let failover_count = conn.query_row(
                    "SELECT COUNT(*) FROM routing_events WHERE failover_from IS NOT NULL",
                    [],
                    |row| row.get::<_, i64>(0),
                )?;

                Ok(Stats {
                    total_requests,
                    total_cost,
                    by_model,
                    by_tier,
                    failover_count,
                })
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(id: &str, model: &str, cost: f64) -> RoutingEvent {
        RoutingEvent {
            id: id.to_string(),
            route_class: "interactive".into(),
            task_type: "chat".into(),
            tier: "speed".into(),
            selected_model: model.to_string(),
            alternatives: vec!["other".into()],
            latency_ms: 120,
            estimated_cost: cost,
        }
    }

    #[tokio::test]
    async fn record_and_read_back_stats() {
        let collector = Collector::open_in_memory().await.unwrap();

        collector
            .record_routing(sample_event("e1", "haiku", 0.001))
            .await
            .unwrap();
        collector
            .record_routing(sample_event("e2", "haiku", 0.002))
            .await
            .unwrap();
        collector
            .record_routing(sample_event("e3", "opus", 0.015))
            .await
            .unwrap();

        let stats = collector.stats(None).await.unwrap();
        assert_eq!(stats.total_requests, 3);
        assert!((stats.total_cost - 0.018).abs() < 1e-10);
        assert_eq!(stats.by_model["haiku"], 2);
        assert_eq!(stats.by_model["opus"], 1);
        assert_eq!(stats.by_tier["speed"], 3);
        assert_eq!(stats.failover_count, 0);
    }

    #[tokio::test]
    async fn stats_model_filter_scopes_totals() {
        let collector = Collector::open_in_memory().await.unwrap();

        collector
            .record_routing(sample_event("e1", "haiku", 0.001))
            .await
            .unwrap();
        collector
            .record_routing(sample_event("e2", "opus", 0.015))
            .await
            .unwrap();

        let stats = collector.stats(Some("opus")).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert!((stats.total_cost - 0.015).abs() < 1e-10);
        // Breakdowns still cover everything.
        assert_eq!(stats.by_model.len(), 2);
    }

    #[tokio::test]
    async fn failover_before_routing_is_preserved() {
        let collector = Collector::open_in_memory().await.unwrap();

        // The failover engine records first (mid-request) ...
        collector
            .record_failover("e1", "opus", "haiku")
            .await
            .unwrap();
        // ... and the handler records the routing event afterwards.
        collector
            .record_routing(sample_event("e1", "haiku", 0.001))
            .await
            .unwrap();

        let stats = collector.stats(None).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failover_count, 1);
        assert_eq!(stats.by_model["haiku"], 1);
    }

    #[tokio::test]
    async fn routing_before_failover_also_works() {
        let collector = Collector::open_in_memory().await.unwrap();

        collector
            .record_routing(sample_event("e1", "opus", 0.015))
            .await
            .unwrap();
        collector
            .record_failover("e1", "opus", "haiku")
            .await
            .unwrap();

        let stats = collector.stats(None).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failover_count, 1);
        // The winner replaces the originally routed model.
        assert_eq!(stats.by_model["haiku"], 1);
        assert!(!stats.by_model.contains_key("opus"));
    }

    #[tokio::test]
    async fn feedback_updates_existing_event() {
        let collector = Collector::open_in_memory().await.unwrap();

        collector
            .record_routing(sample_event("e1", "haiku", 0.001))
            .await
            .unwrap();
        collector
            .record_feedback("e1", 4, Some("opus"))
            .await
            .unwrap();
        collector.record_feedback("e1", 2, None).await.unwrap();

        // Feedback writes never fail the row count.
        let stats = collector.stats(None).await.unwrap();
        assert_eq!(stats.total_requests, 1);
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_conflict() {
        let collector = std::sync::Arc::new(Collector::open_in_memory().await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let collector = collector.clone();
            handles.push(tokio::spawn(async move {
                let id = uuid::Uuid::new_v4().to_string();
                collector
                    .record_routing(RoutingEvent {
                        id,
                        selected_model: format!("model-{}", i % 3),
                        estimated_cost: 0.001,
                        ..RoutingEvent::default()
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = collector.stats(None).await.unwrap();
        assert_eq!(stats.total_requests, 16);
    }
}
