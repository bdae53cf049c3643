use sqlx::SqlitePool;
use tracing::info;

use crate::diff::now_ns;
use crate::error::Result;
use crate::types::{EventDifferenceRecord, MarketDifferenceRecord};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistStats {
    pub events: usize,
    pub markets: usize,
}

/// Persists difference records to `data_differences` and `market_differences`.
///
/// Rows are keyed by (entity id, compared_at) and upserted, so re-running a
/// batch with the same timestamp overwrites instead of duplicating. Writes are
/// issued row by row with no enclosing transaction: a failure mid-batch leaves
/// the rows already written in place and is returned to the caller.
pub struct DiffWriter {
    pool: SqlitePool,
}

impl DiffWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn persist(&self, records: &[EventDifferenceRecord]) -> Result<PersistStats> {
        let mut stats = PersistStats::default();

        for record in records {
            self.write_event_diff(record).await?;
            stats.events += 1;

            for market in &record.markets {
                self.write_market_diff(market).await?;
                stats.markets += 1;
            }
        }

        info!(
            events = stats.events,
            markets = stats.markets,
            "Stored {} event differences ({} market differences)",
            stats.events,
            stats.markets,
        );
        Ok(stats)
    }

    async fn write_event_diff(&self, d: &EventDifferenceRecord) -> Result<()> {
        let payload = serde_json::to_string(&d.payload())?;
        let now = now_ns();

        sqlx::query(
            r#"
            INSERT INTO data_differences (
                event_id, differences_data, compared_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(event_id, compared_at) DO UPDATE SET
                differences_data = excluded.differences_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&d.event_id)
        .bind(payload)
        .bind(d.compared_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn write_market_diff(&self, d: &MarketDifferenceRecord) -> Result<()> {
        let payload = serde_json::to_string(&d.payload())?;
        let now = now_ns();

        sqlx::query(
            r#"
            INSERT INTO market_differences (
                market_id, event_id, differences_data, compared_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(market_id, compared_at) DO UPDATE SET
                differences_data = excluded.differences_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&d.market_id)
        .bind(&d.event_id)
        .bind(payload)
        .bind(d.compared_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::db::Store;
    use crate::error::AppError;
    use crate::types::FieldDelta;

    fn delta(old: f64, new: f64) -> FieldDelta {
        FieldDelta { old, new, difference: new - old, percent_change: 0.0 }
    }

    fn record(event_id: &str, compared_at: i64, new_volume: f64) -> EventDifferenceRecord {
        EventDifferenceRecord {
            event_id: event_id.to_string(),
            fields: BTreeMap::from([("volume".to_string(), delta(0.0, new_volume))]),
            markets: vec![MarketDifferenceRecord {
                market_id: format!("{event_id}-m"),
                event_id: event_id.to_string(),
                fields: BTreeMap::from([("liquidity".to_string(), delta(0.0, 500.0))]),
                prices: None,
                compared_at,
            }],
            compared_at,
        }
    }

    async fn count(store: &Store, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(store.pool())
            .await
            .expect("count")
    }

    #[tokio::test]
    async fn same_timestamp_overwrites() {
        let store = Store::in_memory().await;
        let writer = store.diff_writer();

        writer.persist(&[record("e1", 100, 2_000.0)]).await.expect("first");
        let stats = writer.persist(&[record("e1", 100, 9_000.0)]).await.expect("second");
        assert_eq!(stats, PersistStats { events: 1, markets: 1 });

        assert_eq!(count(&store, "data_differences").await, 1);
        assert_eq!(count(&store, "market_differences").await, 1);

        let payload: String = sqlx::query_scalar("SELECT differences_data FROM data_differences")
            .fetch_one(store.pool())
            .await
            .expect("payload");
        let payload: serde_json::Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(payload["volume"]["new"], 9_000.0);
        assert_eq!(payload["markets"][0]["market_id"], "e1-m");
    }

    #[tokio::test]
    async fn new_timestamp_appends() {
        let store = Store::in_memory().await;
        let writer = store.diff_writer();

        writer.persist(&[record("e1", 100, 2_000.0)]).await.expect("first");
        writer.persist(&[record("e1", 200, 2_000.0)]).await.expect("second");

        assert_eq!(count(&store, "data_differences").await, 2);
        assert_eq!(count(&store, "market_differences").await, 2);
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let store = Store::in_memory().await;
        let writer = store.diff_writer();
        sqlx::query("DROP TABLE market_differences")
            .execute(store.pool())
            .await
            .expect("drop");

        let err = writer
            .persist(&[record("e1", 100, 2_000.0), record("e2", 100, 2_000.0)])
            .await
            .expect_err("missing table must fail");
        assert!(matches!(err, AppError::Database(_)));
        // The event row written before the failure stays.
        assert_eq!(count(&store, "data_differences").await, 1);
    }
}
