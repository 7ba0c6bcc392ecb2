//! Error metrics for scoring backtested forecasts

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pure scalar error function over two aligned sequences
pub type MetricFn = fn(&[f64], &[f64]) -> Result<f64>;

/// Closed enumeration of supported error metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Mean absolute error
    Mae,
    /// Mean absolute percentage error
    Mape,
    /// Root mean squared error
    Rmse,
}

impl MetricKind {
    /// Identifier used in error-table column labels
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Mae => "mae",
            MetricKind::Mape => "mape",
            MetricKind::Rmse => "rmse",
        }
    }

    /// Evaluate this metric on aligned actual/predicted sequences
    pub fn evaluate(&self, actual: &[f64], predicted: &[f64]) -> Result<f64> {
        MetricRegistry::get(*self)(actual, predicted)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mae" => Ok(MetricKind::Mae),
            "mape" => Ok(MetricKind::Mape),
            "rmse" => Ok(MetricKind::Rmse),
            other => Err(ForecastError::UnknownMetric(other.to_string())),
        }
    }
}

/// Registry mapping metric identifiers to their error functions
///
/// The functions are pure and safely shared; the registry is consulted once
/// per cross-validation configuration.
#[derive(Debug)]
pub struct MetricRegistry;

impl MetricRegistry {
    /// Resolve a metric to its error function
    pub fn get(kind: MetricKind) -> MetricFn {
        match kind {
            MetricKind::Mae => mean_absolute_error,
            MetricKind::Mape => mean_absolute_percentage_error,
            MetricKind::Rmse => root_mean_squared_error,
        }
    }
}

fn validate(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Metric input sequences must be non-empty".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Metric input lengths differ: {} actual vs {} predicted",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

/// Mean absolute error between actual and predicted values
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Mean absolute percentage error between actual and predicted values
///
/// Denominators are floored at machine epsilon so zero actuals do not
/// produce infinities.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Root mean squared error between actual and predicted values
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    validate(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok((sum / actual.len() as f64).sqrt())
}
