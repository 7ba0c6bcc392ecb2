//! Historical-average baseline model

use crate::error::{ForecastError, Result};
use crate::models::{interval_z_score, residual_sigma, ForecastModel, ModelForecast};

/// Forecasts the unconditional mean of the fitted history
///
/// Serves as the baseline every other candidate has to beat during
/// cross-validation.
#[derive(Debug, Clone, Default)]
pub struct HistoricAverage {
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    mean: f64,
    sigma: f64,
    n: usize,
}

impl HistoricAverage {
    /// Create a new, unfitted instance
    pub fn new() -> Self {
        Self { fitted: None }
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted
            .as_ref()
            .ok_or(ForecastError::NotFitted("HistoricAverage"))
    }
}

impl ForecastModel for HistoricAverage {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Cannot fit HistoricAverage on an empty series".to_string(),
            ));
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let residuals: Vec<f64> = values.iter().map(|v| v - mean).collect();

        self.fitted = Some(Fitted {
            mean,
            sigma: residual_sigma(&residuals),
            n: values.len(),
        });

        Ok(())
    }

    fn point_forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.fitted()?;
        Ok(vec![fitted.mean; horizon])
    }

    fn interval_forecast(&self, horizon: usize, level: u8) -> Result<ModelForecast> {
        let fitted = self.fitted()?;
        let z = interval_z_score(level)?;

        // Forecast variance of a mean does not grow with the horizon
        let half = z * fitted.sigma * (1.0 + 1.0 / fitted.n as f64).sqrt();

        ModelForecast::from_half_widths(vec![fitted.mean; horizon], vec![half; horizon])
    }

    fn name(&self) -> &'static str {
        "HistoricAverage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn forecasts_the_history_mean() {
        let mut model = HistoricAverage::new();
        model.fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        let forecast = model.point_forecast(3).unwrap();
        assert_eq!(forecast.len(), 3);
        assert_approx_eq!(forecast[0], 2.5);
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = HistoricAverage::new();
        let err = model.point_forecast(1).unwrap_err();
        assert!(matches!(err, ForecastError::NotFitted(_)));
    }

    #[test]
    fn constant_series_has_degenerate_interval() {
        let mut model = HistoricAverage::new();
        model.fit(&[5.0; 10]).unwrap();

        let forecast = model.interval_forecast(2, 68).unwrap();
        assert_eq!(forecast.lo, forecast.hi);
        assert_eq!(forecast.mean, vec![5.0, 5.0]);
    }
}
