//! Wire-level request/response models for the metrics API.
//!
//! Request types carry every field as `Option` so that missing or null JSON
//! values survive deserialization and are reported through the field-level
//! validation below (rendered as `VALIDATION_FAILED` by the routes) instead
//! of failing opaquely in the extractor. Response types serialize in
//! camelCase to match the published contract.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Field-name → message map produced by request-shape validation.
pub type FieldErrors = BTreeMap<String, String>;

const SENSOR_ID_PATTERN_MSG: &str =
    "sensorId must contain only alphanumeric characters, hyphens, and underscores";

/// `^[a-zA-Z0-9_-]+$`
fn is_valid_sensor_id(id: &str) -> bool {
    // ---
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ---

/// Body of `POST /api/weather/metrics/v1/fetch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    // ---
    /// Optional sensor filter; absent or empty means "all sensors".
    #[serde(default)]
    pub sensor_id: Option<Vec<String>>,
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    #[serde(default)]
    pub statistic: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl FetchRequest {
    /// Request-shape checks mirroring the boundary validation contract.
    ///
    /// Returns an empty map when the request is well formed. The statistic
    /// check here is the strict lowercase form; the aggregator re-validates
    /// case-insensitively on its own.
    pub fn validate(&self) -> FieldErrors {
        // ---
        let mut errors = FieldErrors::new();

        if let Some(sensors) = &self.sensor_id {
            if sensors.len() > 100 {
                errors.insert(
                    "sensorId".into(),
                    "Maximum 100 sensors can be queried at once".into(),
                );
            } else if sensors.iter().any(|s| !is_valid_sensor_id(s)) {
                errors.insert("sensorId".into(), SENSOR_ID_PATTERN_MSG.into());
            }
        }

        match &self.metrics {
            Some(metrics) if metrics.len() > 20 => {
                errors.insert(
                    "metrics".into(),
                    "Maximum 20 metrics can be queried at once".into(),
                );
            }
            Some(metrics) if !metrics.is_empty() => {}
            _ => {
                errors.insert(
                    "metrics".into(),
                    "At least one metric must be specified".into(),
                );
            }
        }

        match self.statistic.as_deref() {
            None => {
                errors.insert("statistic".into(), "Statistic type is required".into());
            }
            Some("min" | "max" | "sum" | "average") => {}
            Some(_) => {
                errors.insert(
                    "statistic".into(),
                    "Statistic must be one of: min, max, sum, average".into(),
                );
            }
        }

        errors
    }
}

// ---

/// Per-metric aggregate in a fetch response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStatistic {
    // ---
    pub metric: String,
    /// Echoes the request statistic verbatim, original casing included.
    pub statistic: String,
    pub value: f64,
    pub data_points: i64,
}

/// All aggregates for one sensor, keyed by metric name in ascending order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorResult {
    // ---
    pub sensor_id: String,
    pub metrics: BTreeMap<String, MetricStatistic>,
}

/// Echo of the effective query plus result totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfo {
    // ---
    /// Original sensor filter, omitted entirely when none was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<Vec<String>>,
    pub metrics: Vec<String>,
    pub statistic: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_sensors: i64,
    pub total_data_points: i64,
}

/// Body of a successful fetch response.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    // ---
    pub query: QueryInfo,
    pub results: Vec<SensorResult>,
}

// ---

/// Body of `POST /api/weather/metrics/v1/update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    // ---
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub metrics: Option<MetricsPayload>,
}

/// The fixed set of named metric fields a sensor may report.
///
/// `temperature` and `humidity` are mandatory, the rest optional. Bounds and
/// messages follow the published validation contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPayload {
    // ---
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default)]
    pub uv_index: Option<f64>,
    #[serde(default)]
    pub aqi: Option<f64>,
}

impl MetricsPayload {
    /// Provided metric values in declaration order, mandatory fields first.
    ///
    /// Call only after validation; mandatory fields are skipped here if
    /// absent rather than panicking.
    pub fn provided(&self) -> Vec<(&'static str, f64)> {
        // ---
        let fields = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("windSpeed", self.wind_speed),
            ("windDirection", self.wind_direction),
            ("rainfall", self.rainfall),
            ("uvIndex", self.uv_index),
            ("aqi", self.aqi),
        ];

        fields
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }

    fn validate_into(&self, errors: &mut FieldErrors) {
        // ---
        if self.temperature.is_none() {
            errors.insert(
                "metrics.temperature".into(),
                "temperature is required".into(),
            );
        }
        if self.humidity.is_none() {
            errors.insert("metrics.humidity".into(), "humidity is required".into());
        }

        check_range(
            errors,
            "temperature",
            self.temperature,
            -100.0,
            100.0,
            "temperature must be at least -100°C",
            "temperature must not exceed 100°C",
        );
        check_range(
            errors,
            "humidity",
            self.humidity,
            0.0,
            100.0,
            "humidity must be at least 0%",
            "humidity must not exceed 100%",
        );
        check_range(
            errors,
            "pressure",
            self.pressure,
            800.0,
            1200.0,
            "pressure must be at least 800 hPa",
            "pressure must not exceed 1200 hPa",
        );
        check_range(
            errors,
            "windSpeed",
            self.wind_speed,
            0.0,
            500.0,
            "windSpeed must be at least 0 km/h",
            "windSpeed must not exceed 500 km/h",
        );
        check_range(
            errors,
            "windDirection",
            self.wind_direction,
            0.0,
            360.0,
            "windDirection must be at least 0 degrees",
            "windDirection must not exceed 360 degrees",
        );
        check_range(
            errors,
            "rainfall",
            self.rainfall,
            0.0,
            1000.0,
            "rainfall must be at least 0 mm",
            "rainfall must not exceed 1000 mm",
        );
        check_range(
            errors,
            "uvIndex",
            self.uv_index,
            0.0,
            20.0,
            "uvIndex must be at least 0",
            "uvIndex must not exceed 20",
        );
        // Message text says 1000; the enforced ceiling is 500. Known drift
        // in the published contract, kept as-is.
        check_range(
            errors,
            "aqi",
            self.aqi,
            0.0,
            500.0,
            "aqi must be at least 0",
            "aqi must not exceed 1000",
        );
    }
}

impl UpdateRequest {
    pub fn validate(&self) -> FieldErrors {
        // ---
        let mut errors = FieldErrors::new();

        match self.sensor_id.as_deref() {
            None => {
                errors.insert(
                    "sensorId".into(),
                    "sensorId is required and cannot be blank".into(),
                );
            }
            Some(id) if id.trim().is_empty() => {
                errors.insert(
                    "sensorId".into(),
                    "sensorId is required and cannot be blank".into(),
                );
            }
            Some(id) if !(3..=50).contains(&id.chars().count()) => {
                errors.insert(
                    "sensorId".into(),
                    "sensorId must be between 3 and 50 characters".into(),
                );
            }
            Some(id) if !is_valid_sensor_id(id) => {
                errors.insert("sensorId".into(), SENSOR_ID_PATTERN_MSG.into());
            }
            Some(_) => {}
        }

        match &self.metrics {
            None => {
                errors.insert("metrics".into(), "metrics object is required".into());
            }
            Some(m) => m.validate_into(&mut errors),
        }

        errors
    }
}

/// Inclusive numeric bound check for one metric field.
///
/// `max_msg` is spelled out by the caller because one published message
/// (aqi) does not match its enforced ceiling and must be preserved verbatim.
fn check_range(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
    min_msg: &str,
    max_msg: &str,
) {
    // ---
    if let Some(v) = value {
        if v < min {
            errors.insert(format!("metrics.{field}"), min_msg.into());
        } else if v > max {
            errors.insert(format!("metrics.{field}"), max_msg.into());
        }
    }
}

// ---

/// Body of a successful update response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    // ---
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub saved_count: i64,
}
