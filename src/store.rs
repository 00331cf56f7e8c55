//! Reading store: persistence boundary for sensor metric readings.
//!
//! The aggregator describes what it wants as an [`AggregateFilter`] (time
//! window, metric set, optional sensor set, aggregate operator) and this
//! module translates that into SQL, so the core never handles query text.
//! The write path persists one snapshot marker plus one row per provided
//! metric inside a single transaction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, trace};
use uuid::Uuid;

// ---

/// SQL aggregate operator chosen from the requested statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    // ---
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateFunc {
    /// Map a statistic name (case-insensitive) to its operator.
    pub fn from_statistic(statistic: &str) -> Option<Self> {
        // ---
        match statistic.to_ascii_lowercase().as_str() {
            "min" => Some(AggregateFunc::Min),
            "max" => Some(AggregateFunc::Max),
            "sum" => Some(AggregateFunc::Sum),
            "average" => Some(AggregateFunc::Avg),
            _ => None,
        }
    }

    fn sql_name(self) -> &'static str {
        // ---
        match self {
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
        }
    }
}

/// Structured description of one grouped-aggregate query.
///
/// `sensors` is `None` when no sensor filter applies; an explicit empty list
/// is never stored here (the aggregator collapses it to `None`).
#[derive(Debug, Clone)]
pub struct AggregateFilter {
    // ---
    pub func: AggregateFunc,
    /// Inclusive lower bound of the window.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound of the window.
    pub end: DateTime<Utc>,
    pub metrics: Vec<String>,
    pub sensors: Option<Vec<String>>,
}

/// One grouped row: the chosen aggregate over all readings of a
/// (sensor, metric) pair inside the window, plus the group's row count.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AggregateRow {
    // ---
    pub sensor_id: String,
    pub metric: String,
    pub value: f64,
    pub data_points: i64,
}

// ---

/// Read side of the store, seam for driving the aggregator in tests.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    // ---
    /// Execute one grouped-aggregate query, rows ordered ascending by
    /// (sensor_id, metric).
    async fn aggregate(&self, filter: &AggregateFilter) -> Result<Vec<AggregateRow>>;
}

// ---

/// Postgres-backed store over the `snapshots` / `reading_values` tables.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    // ---
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        PgReadingStore { pool }
    }

    /// Persist one snapshot marker and one reading row per metric value,
    /// all sharing the same sensor id and timestamp, in one transaction.
    ///
    /// Returns the number of reading rows written (the snapshot marker is
    /// not counted). A partial write is never visible: any failure rolls
    /// back the snapshot along with its readings.
    pub async fn record_snapshot(
        &self,
        sensor_id: &str,
        ts: DateTime<Utc>,
        metrics: &[(&str, f64)],
    ) -> Result<i64, sqlx::Error> {
        // ---
        let mut tx = self.pool.begin().await?;

        let snapshot_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO snapshots (id, sensor_id, ts)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(snapshot_id)
        .bind(sensor_id)
        .bind(ts)
        .execute(&mut *tx)
        .await?;

        debug!("Created snapshot: id={}, sensor={}", snapshot_id, sensor_id);

        let mut saved = 0i64;
        for (metric, value) in metrics {
            sqlx::query(
                r#"
                INSERT INTO reading_values (id, snapshot_id, sensor_id, ts, metric, value)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(snapshot_id)
            .bind(sensor_id)
            .bind(ts)
            .bind(metric)
            .bind(value)
            .execute(&mut *tx)
            .await?;
            saved += 1;

            trace!("Saved reading: metric={}, value={}", metric, value);
        }

        tx.commit().await?;
        Ok(saved)
    }
}

/// Render the grouped-aggregate statement for the given operator.
///
/// The operator name comes from the closed [`AggregateFunc`] set and every
/// runtime value is bound as a parameter, so no request data reaches the
/// query text. The sensor clause is emitted only when a filter is present;
/// leaving it out means "all sensors".
fn aggregate_sql(func: AggregateFunc, with_sensor_filter: bool) -> String {
    // ---
    let mut sql = format!(
        "SELECT sensor_id, metric, {}(value) AS value, COUNT(id) AS data_points \
         FROM reading_values \
         WHERE ts >= $1 AND ts < $2 AND metric = ANY($3) ",
        func.sql_name()
    );

    if with_sensor_filter {
        sql.push_str("AND sensor_id = ANY($4) ");
    }

    sql.push_str("GROUP BY sensor_id, metric ORDER BY sensor_id, metric");
    sql
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    // ---
    async fn aggregate(&self, filter: &AggregateFilter) -> Result<Vec<AggregateRow>> {
        // ---
        let sql = aggregate_sql(filter.func, filter.sensors.is_some());

        debug!("Executing aggregate query: {}", sql);
        debug!(
            "Parameters: start={}, end={}, metrics={:?}, sensors={:?}",
            filter.start, filter.end, filter.metrics, filter.sensors
        );

        let mut query = sqlx::query_as::<_, AggregateRow>(&sql)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&filter.metrics);

        if let Some(sensors) = &filter.sensors {
            query = query.bind(sensors);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
