//! Database schema management for `weather-metrics`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `snapshots` table (one marker per ingested reading set) and
/// the `reading_values` table (one row per metric value) together with the
/// range-scan indexes the fetch path relies on. Safe to call on every
/// startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One marker per accepted update request
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            id          UUID        PRIMARY KEY,
            sensor_id   TEXT        NOT NULL,
            ts          TIMESTAMPTZ NOT NULL,
            received_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One row per non-null metric field, tied to its snapshot
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reading_values (
            id          UUID             PRIMARY KEY,
            snapshot_id UUID             NOT NULL REFERENCES snapshots (id),
            sensor_id   TEXT             NOT NULL,
            ts          TIMESTAMPTZ      NOT NULL,
            metric      TEXT             NOT NULL,
            value       DOUBLE PRECISION NOT NULL,
            CONSTRAINT uk_snapshot_metric  UNIQUE (snapshot_id, metric),
            CONSTRAINT uk_sensor_ts_metric UNIQUE (sensor_id, ts, metric)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_snapshots_sensor_ts
            ON snapshots (sensor_id, ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Range-scan indexes backing the grouped aggregate query
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_values_sensor_ts
            ON reading_values (sensor_id, ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_values_metric_ts
            ON reading_values (metric, ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_values_sensor_metric_ts
            ON reading_values (sensor_id, metric, ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
