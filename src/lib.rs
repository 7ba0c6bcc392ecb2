//! # Sensor Forecast
//!
//! A Rust library for environmental sensor time series forecasting with
//! per-entity model selection.
//!
//! ## Features
//!
//! - Long-format time series handling (entity id, timestamp, value)
//! - Rolling-origin cross-validation without temporal leakage
//! - Per-entity best-model decisions scored by MAE, MAPE or RMSE
//! - Forecast production with prediction intervals, restricted to each
//!   entity's latest valid decision
//! - Closed model registry (AutoARIMA, AutoETS, HistoricAverage) handing
//!   out a fresh instance per call
//! - Optional per-entity parallelism via a worker pool
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::Duration;
//! use sensor_forecast::cross_validator::CrossValidator;
//! use sensor_forecast::data::{DataLoader, Frequency, Observation, TimeSeriesFrame};
//! use sensor_forecast::forecaster::Forecaster;
//!
//! # fn main() -> sensor_forecast::Result<()> {
//! // 30 days of history for one sensor
//! let start = DataLoader::parse_timestamp("2023-01-01")?;
//! let rows = (0..30)
//!     .map(|t| Observation {
//!         entity_id: 1,
//!         timestamp: start + Duration::days(t),
//!         value: 10.0 + t as f64,
//!     })
//!     .collect();
//! let history = TimeSeriesFrame::from_rows(rows);
//!
//! // Pick the best model per entity under a rolling backtest
//! let mut cv = CrossValidator::new(
//!     vec!["AutoETS".to_string(), "HistoricAverage".to_string()],
//!     Frequency::Daily,
//! )
//! .with_season_length(14)
//! .with_folds(2);
//! let decisions = cv.fit_transform(&history)?;
//!
//! // Forecast a week ahead with a 68% prediction interval
//! let mut forecaster = Forecaster::new(decisions, Frequency::Daily, vec![68])?;
//! let forecasts = forecaster.fit_predict(&history)?;
//! assert_eq!(forecasts.len(), 7);
//! # Ok(())
//! # }
//! ```

pub mod cross_validator;
pub mod data;
pub mod error;
pub mod forecaster;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use crate::cross_validator::{CrossValidator, DecisionRecord, ErrorRecord};
pub use crate::data::{DataLoader, Frequency, Observation, TimeSeriesFrame};
pub use crate::error::{ForecastError, Result};
pub use crate::forecaster::{ForecastRecord, ForecastTable, Forecaster};
pub use crate::metrics::MetricKind;
pub use crate::models::{ForecastModel, ModelKind, ModelRegistry};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
