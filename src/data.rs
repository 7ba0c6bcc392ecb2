//! Long-format time series data handling for sensor forecasting

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Column name for the entity identifier
pub const UNIQUE_ID: &str = "unique_id";
/// Column name for the observation timestamp
pub const TIMESTAMP: &str = "ds";
/// Column name for the observed value
pub const VALUE: &str = "y";

/// Timestamp format accepted in CSV input
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Date-only fallback format accepted in CSV input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sampling frequency of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// One observation per hour
    Hourly,
    /// One observation per day
    Daily,
}

impl Frequency {
    /// Duration of a single period at this frequency
    pub fn step(&self) -> Duration {
        match self {
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
        }
    }

    /// Short frequency code ("H" or "D")
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
        }
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "H" | "h" => Ok(Frequency::Hourly),
            "D" | "d" => Ok(Frequency::Daily),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unsupported frequency code: '{}'",
                other
            ))),
        }
    }
}

/// One observation of one entity's time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Identifier of the physical source (sensor/variable combination)
    pub entity_id: i64,
    /// Observation timestamp
    pub timestamp: DateTime<Utc>,
    /// Observed value
    pub value: f64,
}

/// A long-format table of observations, sorted by (entity_id, timestamp)
///
/// The frame assumes a regular per-entity grid with no duplicate
/// (entity_id, timestamp) pairs; gaps are an upstream data-quality concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesFrame {
    rows: Vec<Observation>,
}

/// Data loader for long-format sensor tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a time series frame from a CSV file with columns
    /// `unique_id`, `ds`, `y`
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesFrame> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Build a time series frame from an existing DataFrame with columns
    /// `unique_id`, `ds`, `y`
    pub fn from_dataframe(df: DataFrame) -> Result<TimeSeriesFrame> {
        let ids = Self::column_as_i64(&df, UNIQUE_ID)?;
        let timestamps = Self::column_as_timestamps(&df, TIMESTAMP)?;
        let values = Self::column_as_f64(&df, VALUE)?;

        if ids.len() != timestamps.len() || ids.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Column lengths disagree: {} ids, {} timestamps, {} values",
                ids.len(),
                timestamps.len(),
                values.len()
            )));
        }

        let rows = ids
            .into_iter()
            .zip(timestamps)
            .zip(values)
            .map(|((entity_id, timestamp), value)| Observation {
                entity_id,
                timestamp,
                value,
            })
            .collect();

        Ok(TimeSeriesFrame::from_rows(rows))
    }

    fn column_as_i64(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;

        let values: Vec<Option<i64>> = match col.dtype() {
            DataType::Int64 => col.i64().unwrap().into_iter().collect(),
            DataType::Int32 => col
                .i32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as i64))
                .collect(),
            DataType::UInt64 => col
                .u64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as i64))
                .collect(),
            DataType::UInt32 => col
                .u32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as i64))
                .collect(),
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Column '{}' cannot be read as integer ids",
                    name
                )))
            }
        };

        values
            .into_iter()
            .collect::<Option<Vec<i64>>>()
            .ok_or_else(|| {
                ForecastError::DataError(format!("Column '{}' contains null values", name))
            })
    }

    fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;

        let values: Vec<Option<f64>> = match col.dtype() {
            DataType::Float64 => col.f64().unwrap().into_iter().collect(),
            DataType::Float32 => col
                .f32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as f64))
                .collect(),
            DataType::Int64 => col
                .i64()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as f64))
                .collect(),
            DataType::Int32 => col
                .i32()
                .unwrap()
                .into_iter()
                .map(|v| v.map(|v| v as f64))
                .collect(),
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Column '{}' cannot be converted to f64",
                    name
                )))
            }
        };

        values
            .into_iter()
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                ForecastError::DataError(format!("Column '{}' contains null values", name))
            })
    }

    fn column_as_timestamps(df: &DataFrame, name: &str) -> Result<Vec<DateTime<Utc>>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()
                .unwrap()
                .into_iter()
                .map(|opt| {
                    let s = opt.ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Column '{}' contains null values",
                            name
                        ))
                    })?;
                    Self::parse_timestamp(s)
                })
                .collect(),
            DataType::Datetime(unit, _) => {
                let divisor = match unit {
                    TimeUnit::Nanoseconds => 1_000_000_000_i64,
                    TimeUnit::Microseconds => 1_000_000_i64,
                    TimeUnit::Milliseconds => 1_000_i64,
                };
                let nanos_per_unit = 1_000_000_000 / divisor;
                col.datetime()
                    .unwrap()
                    .into_iter()
                    .map(|opt| {
                        let ts = opt.ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "Column '{}' contains null values",
                                name
                            ))
                        })?;
                        let naive = NaiveDateTime::from_timestamp_opt(
                            ts.div_euclid(divisor),
                            (ts.rem_euclid(divisor) * nanos_per_unit) as u32,
                        )
                        .ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "Timestamp {} out of range in column '{}'",
                                ts, name
                            ))
                        })?;
                        Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                    })
                    .collect()
            }
            DataType::Date => col
                .date()
                .unwrap()
                .into_iter()
                .map(|opt| {
                    let days = opt.ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Column '{}' contains null values",
                            name
                        ))
                    })?;
                    let date = NaiveDate::from_ymd_opt(1970, 1, 1)
                        .unwrap()
                        .checked_add_days(chrono::Days::new(days as u64))
                        .ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "Date {} out of range in column '{}'",
                                days, name
                            ))
                        })?;
                    let naive = NaiveDateTime::new(date, chrono::NaiveTime::default());
                    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                })
                .collect(),
            other => Err(ForecastError::DataError(format!(
                "Column '{}' has unsupported timestamp dtype {:?}",
                name, other
            ))),
        }
    }

    /// Parse a timestamp string, accepting a date-only fallback
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .or_else(|_| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map(|d| NaiveDateTime::new(d, chrono::NaiveTime::default()))
            })
            .map_err(|e| {
                ForecastError::DataError(format!("Cannot parse timestamp '{}': {}", s, e))
            })?;

        Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

impl TimeSeriesFrame {
    /// Create a frame from unordered rows, sorting by (entity_id, timestamp)
    pub fn from_rows(mut rows: Vec<Observation>) -> Self {
        rows.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.timestamp.cmp(&b.timestamp))
        });
        Self { rows }
    }

    /// All rows in (entity_id, timestamp) order
    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    /// Number of observations across all entities
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the frame holds no observations
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct entity ids in ascending order
    pub fn entity_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for row in &self.rows {
            if ids.last() != Some(&row.entity_id) {
                ids.push(row.entity_id);
            }
        }
        ids
    }

    /// Contiguous slice of one entity's observations, empty if absent
    pub fn series(&self, entity_id: i64) -> &[Observation] {
        let start = self.rows.partition_point(|r| r.entity_id < entity_id);
        let end = self.rows.partition_point(|r| r.entity_id <= entity_id);
        &self.rows[start..end]
    }

    /// Latest timestamp present anywhere in the frame
    pub fn max_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).max()
    }
}

/// Extract the value column of an entity slice
pub(crate) fn values_of(series: &[Observation]) -> Vec<f64> {
    series.iter().map(|r| r.value).collect()
}
