//! Fetch query aggregator.
//!
//! The read-path core of the service: validates the requested statistic,
//! resolves and bounds the date window, builds the structured aggregate
//! filter, runs it against the store, and shapes the grouped rows into the
//! nested per-sensor/per-metric response. Pure computation over one request;
//! safe to run concurrently and callable directly (without the HTTP layer)
//! in tests, which is why the statistic check is repeated here even though
//! the boundary validation also enforces it.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::FetchError;
use crate::models::{FetchRequest, FetchResponse, MetricStatistic, QueryInfo, SensorResult};
use crate::store::{AggregateFilter, AggregateFunc, AggregateRow, ReadingStore};

// ---

const VALID_STATISTICS: [&str; 4] = ["min", "max", "sum", "average"];

/// Execute one fetch query end to end.
///
/// Date defaulting: a missing end date becomes "today" per the injected
/// clock, then a missing start date becomes that end date minus 7 days.
/// The resolved window covers the full end date (`[start 00:00 UTC,
/// end+1day 00:00 UTC)`), capped at 31 inclusive calendar days.
pub async fn run(
    store: &dyn ReadingStore,
    clock: &dyn Clock,
    request: &FetchRequest,
) -> Result<FetchResponse, FetchError> {
    // ---
    debug!("Processing fetch query: {:?}", request);

    let statistic = validate_statistic(request.statistic.as_deref())?;

    let end_date = request.end_date.unwrap_or_else(|| clock.today());
    let start_date = match request.start_date {
        Some(date) => date,
        // Underflow this close to NaiveDate::MIN leaves the range check to
        // reject the window.
        None => end_date
            .checked_sub_days(Days::new(7))
            .unwrap_or(NaiveDate::MIN),
    };

    debug!("Resolved date range: {} to {}", start_date, end_date);

    validate_date_range(start_date, end_date)?;

    let start_instant = start_date.and_time(NaiveTime::MIN).and_utc();
    let end_instant = end_date
        .succ_opt()
        .ok_or_else(|| {
            FetchError::InvalidArgument("endDate is outside the supported range".to_string())
        })?
        .and_time(NaiveTime::MIN)
        .and_utc();

    // Unreachable after validate_statistic, kept as a defensive check.
    let func = AggregateFunc::from_statistic(statistic)
        .ok_or_else(|| FetchError::InvalidArgument(format!("Invalid statistic: {statistic}")))?;

    debug!("Executing query with aggregate function: {:?}", func);

    let sensors = request.sensor_id.clone().filter(|ids| !ids.is_empty());
    let metrics = request.metrics.clone().unwrap_or_default();

    let filter = AggregateFilter {
        func,
        start: start_instant,
        end: end_instant,
        metrics: metrics.clone(),
        sensors: sensors.clone(),
    };

    let rows = store.aggregate(&filter).await?;

    debug!("Query returned {} raw result rows", rows.len());

    let grouped = group_by_sensor(&rows, statistic);
    let total_data_points: i64 = rows.iter().map(|row| row.data_points).sum();

    let results: Vec<SensorResult> = grouped
        .into_iter()
        .map(|(sensor_id, metrics)| SensorResult { sensor_id, metrics })
        .collect();

    info!(
        "Fetch query successful: {} sensors, {} metrics, {} data points processed",
        results.len(),
        metrics.len(),
        total_data_points
    );

    let query = QueryInfo {
        sensor_id: sensors,
        metrics,
        statistic: statistic.to_string(),
        start_date,
        end_date,
        total_sensors: results.len() as i64,
        total_data_points,
    };

    Ok(FetchResponse { query, results })
}

// ---

fn validate_statistic(statistic: Option<&str>) -> Result<&str, FetchError> {
    // ---
    match statistic {
        Some(s) if VALID_STATISTICS.contains(&s.to_ascii_lowercase().as_str()) => Ok(s),
        other => {
            warn!("Invalid statistic requested: {:?}", other);
            Err(FetchError::InvalidArgument(
                "Statistic must be one of: min, max, sum, average".to_string(),
            ))
        }
    }
}

fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), FetchError> {
    // ---
    if start > end {
        warn!("Invalid date range: start={} is after end={}", start, end);
        return Err(FetchError::InvalidArgument(
            "startDate must be before or equal to endDate".to_string(),
        ));
    }

    let days_between = (end - start).num_days() + 1;
    // The short-range branch is unreachable once start <= end holds, kept
    // to match the contract.
    if days_between < 1 {
        warn!("Date range too short: {} days", days_between);
        return Err(FetchError::InvalidArgument(
            "Date range must be at least 1 day".to_string(),
        ));
    }
    if days_between > 31 {
        warn!("Date range too long: {} days", days_between);
        return Err(FetchError::InvalidArgument(
            "Date range must not exceed 31 days".to_string(),
        ));
    }

    Ok(())
}

/// Nest rows into sensor → metric → statistic maps.
///
/// Both levels are ordered maps so iteration (and serialization) follows
/// ascending sensor id, then ascending metric name — the same order the
/// rows arrive in. The `statistic` field carries the literal request
/// string, not the normalized form.
fn group_by_sensor(
    rows: &[AggregateRow],
    statistic: &str,
) -> BTreeMap<String, BTreeMap<String, MetricStatistic>> {
    // ---
    let mut grouped: BTreeMap<String, BTreeMap<String, MetricStatistic>> = BTreeMap::new();

    for row in rows {
        grouped.entry(row.sensor_id.clone()).or_default().insert(
            row.metric.clone(),
            MetricStatistic {
                metric: row.metric.clone(),
                statistic: statistic.to_string(),
                value: row.value,
                data_points: row.data_points,
            },
        );
    }

    debug!("Grouped results into {} sensors", grouped.len());
    grouped
}
