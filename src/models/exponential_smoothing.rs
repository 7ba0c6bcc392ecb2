//! Seasonal exponential-smoothing model

use crate::error::{ForecastError, Result};
use crate::models::{interval_z_score, residual_sigma, ForecastModel, ModelForecast};

const ALPHA_GRID: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

/// Simple exponential smoothing with an additive seasonal component
///
/// The smoothing factor is picked from a small grid by one-step-ahead
/// in-sample error. The seasonal component is estimated only when the
/// history covers at least two full seasons; shorter series degrade to
/// plain level smoothing.
#[derive(Debug, Clone)]
pub struct AutoEts {
    season_length: usize,
    fitted: Option<Fitted>,
}

#[derive(Debug, Clone)]
struct Fitted {
    level: f64,
    seasonal: Vec<f64>,
    /// Seasonal index of the first forecast step
    phase: usize,
    sigma: f64,
}

impl AutoEts {
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
            .ok_or(ForecastError::NotFitted("AutoETS"))
    }

    /// Additive seasonal indices, all zero when the history is too short
    fn seasonal_indices(&self, values: &[f64]) -> Vec<f64> {
        let period = self.season_length;
        if period < 2 || values.len() < 2 * period {
            return vec![0.0; period];
        }

        let overall = values.iter().sum::<f64>() / values.len() as f64;
        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for (i, v) in values.iter().enumerate() {
            sums[i % period] += v;
            counts[i % period] += 1;
        }

        sums.iter()
            .zip(counts.iter())
            .map(|(s, c)| s / *c as f64 - overall)
            .collect()
    }

    /// One pass of simple smoothing, returning final level and residuals
    fn smooth(alpha: f64, deseasonalized: &[f64]) -> (f64, Vec<f64>) {
        let mut level = deseasonalized[0];
        let mut residuals = Vec::with_capacity(deseasonalized.len().saturating_sub(1));

        for &d in &deseasonalized[1..] {
            residuals.push(d - level);
            level = alpha * d + (1.0 - alpha) * level;
        }

        (level, residuals)
    }
}

impl ForecastModel for AutoEts {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(ForecastError::InvalidInput(
                "Cannot fit AutoETS on an empty series".to_string(),
            ));
        }

        let seasonal = self.seasonal_indices(values);
        let period = self.season_length;
        let deseasonalized: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| v - seasonal[i % period])
            .collect();

        // First-listed alpha wins ties via strict comparison
        let mut best_alpha = ALPHA_GRID[0];
        let mut best_sse = f64::INFINITY;
        for alpha in ALPHA_GRID {
            let (_, residuals) = Self::smooth(alpha, &deseasonalized);
            let sse: f64 = residuals.iter().map(|r| r.powi(2)).sum();
            if sse < best_sse {
                best_sse = sse;
                best_alpha = alpha;
            }
        }

        let (level, residuals) = Self::smooth(best_alpha, &deseasonalized);

        self.fitted = Some(Fitted {
            level,
            seasonal,
            phase: values.len() % period,
            sigma: residual_sigma(&residuals),
        });

        Ok(())
    }

    fn point_forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.fitted()?;
        let period = fitted.seasonal.len();

        Ok((0..horizon)
            .map(|t| fitted.level + fitted.seasonal[(fitted.phase + t) % period])
            .collect())
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
        "AutoETS"
    }
}
