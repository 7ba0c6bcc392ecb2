//! Seasonal auto-regressive model

use crate::error::{ForecastError, Result};
use crate::models::{interval_z_score, residual_sigma, ForecastModel, ModelForecast};

/// AR(1) on the (optionally seasonally differenced) series
///
/// When the history covers at least two full seasons the series is
/// differenced at the seasonal lag before fitting, and forecasts are
/// re-integrated against the observed tail. Shorter series are fit
/// directly.
#[derive(Debug, Clone)]
pub struct AutoArima {
    season_length: usize,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    mu: f64,
    phi: f64,
    sigma: f64,
    last_deviation: f64,
    /// Last season of observed values when seasonal differencing was applied
    tail: Option<Vec<f64>>,
}

impl AutoArima {
    /// Create a new, unfitted instance
    pub fn new(season_length: usize) -> Self {
        Self {
            season_length: season_length.max(1),
            fitted: None,
        }
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted
            .as_ref()
            .ok_or(ForecastError::NotFitted("AutoARIMA"))
    }

    /// Least-squares AR(1) coefficient, clamped into the stationary region
    fn ar_coefficient(deviations: &[f64]) -> f64 {
        if deviations.len() < 2 {
            return 0.0;
        }

        let num: f64 = deviations
            .windows(2)
            .map(|w| w[0] * w[1])
            .sum();
        let den: f64 = deviations[..deviations.len() - 1]
            .iter()
            .map(|d| d.powi(2))
            .sum();

        if den <= f64::EPSILON {
            return 0.0;
        }

        (num / den).clamp(-0.98, 0.98)
    }
}

impl ForecastModel for AutoArima {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Cannot fit AutoARIMA on an empty series".to_string(),
            ));
        }

        let period = self.season_length;
        let (series, tail) = if period > 1 && values.len() >= 2 * period + 2 {
            let differenced: Vec<f64> = values
                .iter()
                .skip(period)
                .zip(values.iter())
                .map(|(y, lagged)| y - lagged)
                .collect();
            let tail = values[values.len() - period..].to_vec();
            (differenced, Some(tail))
        } else {
            (values.to_vec(), None)
        };

        let mu = series.iter().sum::<f64>() / series.len() as f64;
        let deviations: Vec<f64> = series.iter().map(|v| v - mu).collect();
        let phi = Self::ar_coefficient(&deviations);

        let residuals: Vec<f64> = deviations
            .windows(2)
            .map(|w| w[1] - phi * w[0])
            .collect();

        self.fitted = Some(Fitted {
            mu,
            phi,
            sigma: residual_sigma(&residuals),
            last_deviation: *deviations.last().unwrap_or(&0.0),
            tail,
        });

        Ok(())
    }

    fn point_forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.fitted()?;

        let mut deviation = fitted.last_deviation;
        let mut differenced = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            deviation *= fitted.phi;
            differenced.push(fitted.mu + deviation);
        }

        match &fitted.tail {
            Some(tail) => {
                // Re-integrate: each step adds the forecast difference to the
                // value one season earlier (observed or already forecast)
                let period = tail.len();
                let mut extended = tail.clone();
                let mut out = Vec::with_capacity(horizon);
                for d in differenced {
                    let base = extended[extended.len() - period];
                    let value = base + d;
                    extended.push(value);
                    out.push(value);
                }
                Ok(out)
            }
            None => Ok(differenced),
        }
    }

    fn interval_forecast(&self, horizon: usize, level: u8) -> Result<ModelForecast> {
        let fitted = self.fitted()?;
        let z = interval_z_score(level)?;
        let mean = self.point_forecast(horizon)?;

        let half_widths = (0..horizon)
            .map(|t| z * fitted.sigma * ((t + 1) as f64).sqrt())
            .collect();

        ModelForecast::from_half_widths(mean, half_widths)
    }

    fn name(&self) -> &'static str {
        "AutoARIMA"
    }
}
