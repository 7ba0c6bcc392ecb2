//! Forecasting models for sensor time series
//!
//! Each model is an opaque fit/predict unit. The registry is a closed
//! enumeration of supported kinds and hands out a fresh, independent
//! instance per call so no fit state is ever shared across entities,
//! folds, or workers.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use std::str::FromStr;

pub mod arima;
pub mod exponential_smoothing;
pub mod historic_average;

pub use arima::AutoArima;
pub use exponential_smoothing::AutoEts;
pub use historic_average::HistoricAverage;

/// Point forecasts plus prediction interval bounds for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct ModelForecast {
    /// Point forecasts, one per horizon step
    pub mean: Vec<f64>,
    /// Lower interval bounds
    pub lo: Vec<f64>,
    /// Upper interval bounds
    pub hi: Vec<f64>,
}

impl ModelForecast {
    /// Build a forecast from point values and symmetric interval half-widths
    pub fn from_half_widths(mean: Vec<f64>, half_widths: Vec<f64>) -> Result<Self> {
        if mean.len() != half_widths.len() {
            return Err(ForecastError::InvalidInput(format!(
                "Forecast length ({}) doesn't match interval length ({})",
                mean.len(),
                half_widths.len()
            )));
        }

        let lo = mean
            .iter()
            .zip(half_widths.iter())
            .map(|(m, w)| m - w)
            .collect();
        let hi = mean
            .iter()
            .zip(half_widths.iter())
            .map(|(m, w)| m + w)
            .collect();

        Ok(Self { mean, lo, hi })
    }

    /// Number of forecast steps
    pub fn horizon(&self) -> usize {
        self.mean.len()
    }
}

/// A forecasting model exposing a fit/predict capability
///
/// Instances are single-use per fit/predict cycle; the cross-validator and
/// forecaster always request a fresh instance from the registry.
pub trait ForecastModel: fmt::Debug + Send {
    /// Fit the model on an entity's history
    fn fit(&mut self, values: &[f64]) -> Result<()>;

    /// Point forecasts for the next `horizon` periods
    fn point_forecast(&self, horizon: usize) -> Result<Vec<f64>>;

    /// Point forecasts with a central prediction interval at `level` percent
    fn interval_forecast(&self, horizon: usize, level: u8) -> Result<ModelForecast>;

    /// Registry identifier of the model
    fn name(&self) -> &'static str;
}

/// Closed enumeration of supported model kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Seasonal auto-regressive model
    AutoArima,
    /// Seasonal exponential-smoothing model
    AutoEts,
    /// Historical-average baseline
    HistoricAverage,
}

impl ModelKind {
    /// Registry identifier of the model kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::AutoArima => "AutoARIMA",
            ModelKind::AutoEts => "AutoETS",
            ModelKind::HistoricAverage => "HistoricAverage",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AutoARIMA" => Ok(ModelKind::AutoArima),
            "AutoETS" => Ok(ModelKind::AutoEts),
            "HistoricAverage" => Ok(ModelKind::HistoricAverage),
            other => Err(ForecastError::UnknownModel(other.to_string())),
        }
    }
}

/// Factory for forecasting model instances
///
/// Every `create` call constructs a new value from immutable configuration,
/// so repeated or concurrent use never shares internal fit state.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    season_length: usize,
}

impl ModelRegistry {
    /// Create a registry whose seasonal models use the given season length
    pub fn new(season_length: usize) -> Self {
        Self { season_length }
    }

    /// Resolve a model identifier to its kind
    pub fn resolve(&self, name: &str) -> Result<ModelKind> {
        name.parse()
    }

    /// Construct a fresh, independent instance of the given model kind
    pub fn create(&self, kind: ModelKind) -> Box<dyn ForecastModel> {
        match kind {
            ModelKind::AutoArima => Box::new(AutoArima::new(self.season_length)),
            ModelKind::AutoEts => Box::new(AutoEts::new(self.season_length)),
            ModelKind::HistoricAverage => Box::new(HistoricAverage::new()),
        }
    }
}

/// Standard-normal multiplier for a central interval at `level` percent coverage
pub(crate) fn interval_z_score(level: u8) -> Result<f64> {
    if level == 0 || level >= 100 {
        return Err(ForecastError::InvalidParameter(format!(
            "Confidence level must be in 1..=99, got {}",
            level
        )));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

    Ok(normal.inverse_cdf(0.5 + level as f64 / 200.0))
}

/// Residual standard deviation, zero when fewer than two residuals exist
pub(crate) fn residual_sigma(residuals: &[f64]) -> f64 {
    if residuals.len() < 2 {
        return 0.0;
    }

    let sum_sq: f64 = residuals.iter().map(|r| r.powi(2)).sum();
    (sum_sq / (residuals.len() - 1) as f64).sqrt()
}
