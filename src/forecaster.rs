//! Forecast production from cross-validation decisions

use crate::cross_validator::DecisionRecord;
use crate::data::{values_of, Frequency, Observation, TimeSeriesFrame, TIMESTAMP, UNIQUE_ID};
use crate::error::{ForecastError, Result};
use crate::models::ModelRegistry;
use chrono::{DateTime, Utc};
use polars::prelude::{DataFrame, NamedFrom, Series};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Column name for point forecasts
pub const PREDICTION: &str = "prediction";

/// One forecast step for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// Entity the forecast belongs to
    pub entity_id: i64,
    /// Forecast timestamp, strictly after the entity's history
    pub timestamp: DateTime<Utc>,
    /// Point forecast
    pub prediction: f64,
    /// Lower prediction interval bound
    pub lo: f64,
    /// Upper prediction interval bound
    pub hi: f64,
}

/// Forecasts for all entities at a single confidence level
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    level: u8,
    records: Vec<ForecastRecord>,
}

impl ForecastTable {
    /// Confidence level of the interval bounds, in percent
    pub fn level(&self) -> u8 {
        self.level
    }

    /// All rows in (entity_id, timestamp) order
    pub fn records(&self) -> &[ForecastRecord] {
        &self.records
    }

    /// Number of forecast rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Level-qualified lower bound column name
    pub fn lo_column(&self) -> String {
        format!("{}-lo-{}", PREDICTION, self.level)
    }

    /// Level-qualified upper bound column name
    pub fn hi_column(&self) -> String {
        format!("{}-hi-{}", PREDICTION, self.level)
    }

    /// Convert to a DataFrame with columns `unique_id`, `ds`, `prediction`,
    /// `prediction-lo-{level}`, `prediction-hi-{level}`
    ///
    /// Bound columns carry the level so tables produced at different levels
    /// stay mergeable.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let ids = Series::new(
            UNIQUE_ID,
            self.records.iter().map(|r| r.entity_id).collect::<Vec<i64>>(),
        );
        let timestamps = Series::new(
            TIMESTAMP,
            self.records
                .iter()
                .map(|r| r.timestamp.timestamp_millis())
                .collect::<Vec<i64>>(),
        );
        let predictions = Series::new(
            PREDICTION,
            self.records.iter().map(|r| r.prediction).collect::<Vec<f64>>(),
        );
        let lo = Series::new(
            &self.lo_column(),
            self.records.iter().map(|r| r.lo).collect::<Vec<f64>>(),
        );
        let hi = Series::new(
            &self.hi_column(),
            self.records.iter().map(|r| r.hi).collect::<Vec<f64>>(),
        );

        Ok(DataFrame::new(vec![ids, timestamps, predictions, lo, hi])?)
    }
}

/// Produces per-entity forecasts using each entity's most recent valid
/// model selection
///
/// Construction takes the decision table from cross-validation; `fit`
/// restricts it to the latest decision window consistent with the supplied
/// history, and `predict` forecasts every retained entity.
#[derive(Debug)]
pub struct Forecaster {
    decisions: Vec<DecisionRecord>,
    freq: Frequency,
    forecast_horizon: usize,
    season_length: usize,
    level: u8,
    n_jobs: usize,
    is_fitted: bool,
}

impl Forecaster {
    /// Create a forecaster from a decision table and exactly one
    /// confidence level
    ///
    /// Defaults: horizon 7, season length 365, 1 job.
    pub fn new(
        decisions: Vec<DecisionRecord>,
        freq: Frequency,
        levels: Vec<u8>,
    ) -> Result<Self> {
        if levels.len() > 1 {
            return Err(ForecastError::UnsupportedConfiguration(
                "Multiple confidence levels are not supported yet".to_string(),
            ));
        }
        let level = *levels.first().ok_or_else(|| {
            ForecastError::UnsupportedConfiguration(
                "At least one confidence level must be provided".to_string(),
            )
        })?;
        if level == 0 || level >= 100 {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence level must be in 1..=99, got {}",
                level
            )));
        }

        Ok(Self {
            decisions,
            freq,
            forecast_horizon: 7,
            season_length: 365,
            level,
            n_jobs: 1,
            is_fitted: false,
        })
    }

    /// Set the forecast horizon in periods
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    /// Set the seasonal cycle length used when re-fitting chosen models
    pub fn with_season_length(mut self, season_length: usize) -> Self {
        self.season_length = season_length;
        self
    }

    /// Set the parallelism degree for per-entity forecasting
    pub fn with_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs.max(1);
        self
    }

    /// Decision rows currently held by the forecaster
    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    /// Restrict the decision table to the latest selection valid for the
    /// supplied history
    ///
    /// Future-dated decisions are dropped, then only rows sharing the single
    /// most recent remaining start date are kept (ties across entities are
    /// retained).
    pub fn fit(&mut self, history: &TimeSeriesFrame) -> Result<&mut Self> {
        match history.max_timestamp() {
            Some(max_ts) => {
                self.decisions.retain(|d| d.start_date <= max_ts);
                if let Some(latest) = self.decisions.iter().map(|d| d.start_date).max() {
                    self.decisions.retain(|d| d.start_date == latest);
                }
                debug!(
                    retained = self.decisions.len(),
                    "retained latest applicable decisions"
                );
            }
            None => {
                warn!("empty history, no decisions retained");
                self.decisions.clear();
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Forecast every retained entity from its full available history
    ///
    /// Entities missing from `history` contribute no rows; rows are
    /// concatenated and sorted by (entity_id, timestamp).
    pub fn predict(&self, history: &TimeSeriesFrame) -> Result<ForecastTable> {
        if !self.is_fitted {
            return Err(ForecastError::NotFitted("Forecaster"));
        }

        let registry = ModelRegistry::new(self.season_length);
        let forecast_one = |decision: &DecisionRecord| -> Result<Vec<ForecastRecord>> {
            self.forecast_entity(decision, history.series(decision.entity_id), &registry)
        };

        let nested: Vec<Vec<ForecastRecord>> = if self.n_jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
            pool.install(|| {
                self.decisions
                    .par_iter()
                    .map(forecast_one)
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            self.decisions
                .iter()
                .map(forecast_one)
                .collect::<Result<Vec<_>>>()?
        };

        let mut records: Vec<ForecastRecord> = nested.into_iter().flatten().collect();
        records.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.timestamp.cmp(&b.timestamp))
        });

        Ok(ForecastTable {
            level: self.level,
            records,
        })
    }

    /// Fit and predict in one call
    pub fn fit_predict(&mut self, history: &TimeSeriesFrame) -> Result<ForecastTable> {
        self.fit(history)?;
        self.predict(history)
    }

    fn forecast_entity(
        &self,
        decision: &DecisionRecord,
        series: &[Observation],
        registry: &ModelRegistry,
    ) -> Result<Vec<ForecastRecord>> {
        let Some(last) = series.last() else {
            // Expected and recoverable: the entity simply contributes no rows
            warn!(
                entity_id = decision.entity_id,
                "no history for entity, skipping"
            );
            return Ok(Vec::new());
        };

        let kind = registry.resolve(&decision.best_model)?;
        let mut model = registry.create(kind);
        model.fit(&values_of(series))?;
        let forecast = model.interval_forecast(self.forecast_horizon, self.level)?;

        let step = self.freq.step();
        Ok((0..self.forecast_horizon)
            .map(|t| ForecastRecord {
                entity_id: decision.entity_id,
                timestamp: last.timestamp + step * (t as i32 + 1),
                prediction: forecast.mean[t],
                lo: forecast.lo[t],
                hi: forecast.hi[t],
            })
            .collect())
    }
}
