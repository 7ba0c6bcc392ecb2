//! Rolling-origin cross-validation and best-model selection
//!
//! For every entity, candidate models are re-fit on progressively shorter
//! histories and scored against withheld ground truth. No observation past
//! a fold's cutoff is ever visible to a model being fit for that fold.

use crate::data::{values_of, Frequency, Observation, TimeSeriesFrame, UNIQUE_ID};
use crate::error::{ForecastError, Result};
use crate::metrics::{MetricFn, MetricKind, MetricRegistry};
use crate::models::{ForecastModel, ModelKind, ModelRegistry};
use chrono::{DateTime, Utc};
use polars::prelude::{DataFrame, NamedFrom, Series};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Column name for the first instant a decision is valid
pub const START_DATE: &str = "start_date";
/// Column name for the winning model identifier
pub const BEST_MODEL: &str = "best_model";
/// Column name for the last timestamp used in a fold's fit
pub const CUTOFF: &str = "cutoff";

/// Outcome of cross-validation for one entity and decision window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Entity the decision applies to
    pub entity_id: i64,
    /// First instant from which the decision is valid
    pub start_date: DateTime<Utc>,
    /// Identifier of the winning model
    pub best_model: String,
}

/// Diagnostic backtest errors for one (entity, cutoff) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Entity the fold belongs to
    pub entity_id: i64,
    /// Last timestamp included when fitting this fold
    pub cutoff: DateTime<Utc>,
    /// Identifier of the winning model
    pub best_model: String,
    /// Metric-qualified model name and error value, in candidate order
    pub errors: Vec<(String, f64)>,
}

/// Convert a decision table to a DataFrame with columns
/// `unique_id`, `start_date`, `best_model`
pub fn decisions_to_dataframe(decisions: &[DecisionRecord]) -> Result<DataFrame> {
    let ids = Series::new(
        UNIQUE_ID,
        decisions.iter().map(|d| d.entity_id).collect::<Vec<i64>>(),
    );
    let starts = Series::new(
        START_DATE,
        decisions
            .iter()
            .map(|d| d.start_date.timestamp_millis())
            .collect::<Vec<i64>>(),
    );
    let best = Series::new(
        BEST_MODEL,
        decisions
            .iter()
            .map(|d| d.best_model.clone())
            .collect::<Vec<String>>(),
    );

    Ok(DataFrame::new(vec![ids, starts, best])?)
}

/// Convert a diagnostic error table to a DataFrame with columns
/// `unique_id`, `cutoff`, `best_model`, plus one metric-qualified error
/// column per candidate model
pub fn errors_to_dataframe(records: &[ErrorRecord]) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new(
            UNIQUE_ID,
            records.iter().map(|r| r.entity_id).collect::<Vec<i64>>(),
        ),
        Series::new(
            CUTOFF,
            records
                .iter()
                .map(|r| r.cutoff.timestamp_millis())
                .collect::<Vec<i64>>(),
        ),
        Series::new(
            BEST_MODEL,
            records
                .iter()
                .map(|r| r.best_model.clone())
                .collect::<Vec<String>>(),
        ),
    ];

    let labels: Vec<String> = records
        .first()
        .map(|r| r.errors.iter().map(|(label, _)| label.clone()).collect())
        .unwrap_or_default();
    for (i, label) in labels.iter().enumerate() {
        let values: Vec<f64> = records
            .iter()
            .map(|r| r.errors.get(i).map_or(f64::NAN, |(_, v)| *v))
            .collect();
        columns.push(Series::new(label, values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Rolling-origin backtester that decides, per entity and decision window,
/// which candidate model to forecast with
///
/// Lifecycle: `new` (configuration) → `fit` (binds candidates and metric) →
/// `transform` (runs the backtest, emits the decision table). The raw error
/// matrix is kept as a diagnostic and readable only after `transform`.
#[derive(Debug)]
pub struct CrossValidator {
    model_names: Vec<String>,
    freq: Frequency,
    forecast_horizon: usize,
    season_length: usize,
    cv_folds: usize,
    metric: MetricKind,
    n_jobs: usize,
    resolved_models: Option<Vec<ModelKind>>,
    metric_fn: Option<MetricFn>,
    error_table: Option<Vec<ErrorRecord>>,
}

impl CrossValidator {
    /// Create a validator for the given candidate models and frequency
    ///
    /// Defaults: horizon 7, season length 365, 5 folds, MAE, 1 job.
    pub fn new(models: Vec<String>, freq: Frequency) -> Self {
        Self {
            model_names: models,
            freq,
            forecast_horizon: 7,
            season_length: 365,
            cv_folds: 5,
            metric: MetricKind::Mae,
            n_jobs: 1,
            resolved_models: None,
            metric_fn: None,
            error_table: None,
        }
    }

    /// Set the forecast horizon in periods
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.forecast_horizon = horizon;
        self
    }

    /// Set the seasonal cycle length in periods
    pub fn with_season_length(mut self, season_length: usize) -> Self {
        self.season_length = season_length;
        self
    }

    /// Set the number of cross-validation folds
    pub fn with_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Set the metric used to compare candidate models
    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    /// Set the parallelism degree for per-entity backtesting
    pub fn with_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs.max(1);
        self
    }

    /// Bind the candidate model set and resolve the metric function
    ///
    /// Performs no data-dependent work; unknown model identifiers and
    /// degenerate fold/horizon settings fail here.
    pub fn fit(&mut self, _x: &TimeSeriesFrame) -> Result<&mut Self> {
        if self.model_names.is_empty() {
            return Err(ForecastError::UnsupportedConfiguration(
                "At least one candidate model is required".to_string(),
            ));
        }
        if self.forecast_horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least 1".to_string(),
            ));
        }
        if self.cv_folds == 0 {
            return Err(ForecastError::InvalidParameter(
                "Fold count must be at least 1".to_string(),
            ));
        }

        let registry = ModelRegistry::new(self.season_length);
        let resolved = self
            .model_names
            .iter()
            .map(|name| registry.resolve(name))
            .collect::<Result<Vec<ModelKind>>>()?;

        self.resolved_models = Some(resolved);
        self.metric_fn = Some(MetricRegistry::get(self.metric));

        Ok(self)
    }

    /// Run the backtest and emit the decision table
    ///
    /// One decision row per (entity, cutoff); the cutoff is advanced by one
    /// horizon to yield the decision's validity start. Entities too short
    /// for a single fold contribute no rows.
    pub fn transform(&mut self, x: &TimeSeriesFrame) -> Result<Vec<DecisionRecord>> {
        let models = self
            .resolved_models
            .clone()
            .ok_or(ForecastError::NotFitted("CrossValidator"))?;
        let metric_fn = self
            .metric_fn
            .ok_or(ForecastError::NotFitted("CrossValidator"))?;

        let registry = ModelRegistry::new(self.season_length);
        let entities = x.entity_ids();
        let step = (self.season_length / self.cv_folds).max(1);
        info!(
            entities = entities.len(),
            folds = self.cv_folds,
            step,
            horizon = self.forecast_horizon,
            "running rolling-origin backtest"
        );

        let backtest = |entity_id: &i64| -> Result<Vec<ErrorRecord>> {
            self.backtest_entity(*entity_id, x.series(*entity_id), &models, metric_fn, &registry, step)
        };

        let nested: Vec<Vec<ErrorRecord>> = if self.n_jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.n_jobs)
                .build()
                .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
            pool.install(|| {
                entities
                    .par_iter()
                    .map(backtest)
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            entities.iter().map(backtest).collect::<Result<Vec<_>>>()?
        };

        // Keyed sort makes the output insensitive to worker scheduling
        let mut records: Vec<ErrorRecord> = nested.into_iter().flatten().collect();
        records.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then(a.cutoff.cmp(&b.cutoff))
        });

        let horizon_offset = self.freq.step() * self.forecast_horizon as i32;
        let decisions = records
            .iter()
            .map(|r| DecisionRecord {
                entity_id: r.entity_id,
                start_date: r.cutoff + horizon_offset,
                best_model: r.best_model.clone(),
            })
            .collect();

        self.error_table = Some(records);

        Ok(decisions)
    }

    /// Fit and transform in one call
    pub fn fit_transform(&mut self, x: &TimeSeriesFrame) -> Result<Vec<DecisionRecord>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Raw per-(entity, cutoff) error matrix from the last `transform`
    pub fn error_table(&self) -> Result<&[ErrorRecord]> {
        self.error_table
            .as_deref()
            .ok_or(ForecastError::NotTransformed)
    }

    fn backtest_entity(
        &self,
        entity_id: i64,
        series: &[Observation],
        models: &[ModelKind],
        metric_fn: MetricFn,
        registry: &ModelRegistry,
        step: usize,
    ) -> Result<Vec<ErrorRecord>> {
        let values = values_of(series);
        let cutoffs = fold_cutoffs(series.len(), self.forecast_horizon, self.cv_folds, step);
        if cutoffs.is_empty() {
            debug!(
                entity_id,
                observations = series.len(),
                "series too short to backtest, skipping entity"
            );
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(cutoffs.len());
        for cut in cutoffs {
            let train = &values[..=cut];
            let actual = &values[cut + 1..cut + 1 + self.forecast_horizon];

            let mut errors = Vec::with_capacity(models.len());
            let mut best: Option<(usize, f64)> = None;
            for (idx, kind) in models.iter().enumerate() {
                let mut model = registry.create(*kind);
                let err = score_window(model.as_mut(), train, actual, metric_fn)?;

                // First-listed candidate wins exact ties; NaN never wins
                let better = match best {
                    None => true,
                    Some((_, incumbent)) => {
                        err < incumbent || (incumbent.is_nan() && !err.is_nan())
                    }
                };
                if better {
                    best = Some((idx, err));
                }

                errors.push((format!("{}_{}", self.metric, kind), err));
            }

            let (best_idx, _) = best.ok_or_else(|| {
                ForecastError::UnsupportedConfiguration(
                    "At least one candidate model is required".to_string(),
                )
            })?;

            records.push(ErrorRecord {
                entity_id,
                cutoff: series[cut].timestamp,
                best_model: models[best_idx].as_str().to_string(),
                errors,
            });
        }

        Ok(records)
    }
}

/// Indices of the last training observation for each fold, newest first
///
/// Folds that would reach before the start of the series are dropped, so
/// short histories degrade to fewer windows rather than failing.
fn fold_cutoffs(n: usize, horizon: usize, folds: usize, step: usize) -> Vec<usize> {
    let mut cutoffs = Vec::with_capacity(folds);
    for i in 0..folds {
        match n.checked_sub(1 + horizon + i * step) {
            Some(idx) => cutoffs.push(idx),
            None => break,
        }
    }
    cutoffs
}

/// Fit a fresh model on the training slice and score its forecast of the
/// withheld slice
fn score_window(
    model: &mut dyn ForecastModel,
    train: &[f64],
    actual: &[f64],
    metric_fn: MetricFn,
) -> Result<f64> {
    model.fit(train)?;
    let predicted = model.point_forecast(actual.len())?;
    metric_fn(actual, &predicted)
}
