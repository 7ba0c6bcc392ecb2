use assert_approx_eq::assert_approx_eq;
use rstest::rstest;
use sensor_forecast::models::{ForecastModel as _, ModelKind, ModelRegistry};
use sensor_forecast::ForecastError;

#[test]
fn test_unknown_model_is_rejected() {
    let registry = ModelRegistry::new(7);
    let err = registry.resolve("Prophet").unwrap_err();
    assert!(matches!(err, ForecastError::UnknownModel(_)));
}

#[test]
fn test_identifiers_round_trip() {
    let registry = ModelRegistry::new(7);
    for name in ["AutoARIMA", "AutoETS", "HistoricAverage"] {
        let kind = registry.resolve(name).unwrap();
        assert_eq!(kind.as_str(), name);
    }
}

#[rstest]
#[case(ModelKind::AutoArima)]
#[case(ModelKind::AutoEts)]
#[case(ModelKind::HistoricAverage)]
fn test_registry_instances_are_independent(#[case] kind: ModelKind) {
    let registry = ModelRegistry::new(4);
    let series: Vec<f64> = (0..20).map(|t| 10.0 + (t % 4) as f64).collect();
    let other: Vec<f64> = (0..20).map(|t| 100.0 - t as f64).collect();

    let mut a = registry.create(kind);
    let mut b = registry.create(kind);
    a.fit(&series).unwrap();
    b.fit(&series).unwrap();

    // Same data, same predictions
    assert_eq!(
        a.point_forecast(5).unwrap(),
        b.point_forecast(5).unwrap()
    );

    // Refitting one never affects the other
    let before = a.point_forecast(5).unwrap();
    b.fit(&other).unwrap();
    assert_eq!(a.point_forecast(5).unwrap(), before);
    assert_ne!(b.point_forecast(5).unwrap(), before);
}

#[rstest]
#[case(ModelKind::AutoArima)]
#[case(ModelKind::AutoEts)]
#[case(ModelKind::HistoricAverage)]
fn test_forecast_shape_and_interval_ordering(#[case] kind: ModelKind) {
    let registry = ModelRegistry::new(7);
    let series: Vec<f64> = (0..30).map(|t| 20.0 + (t as f64 * 0.5).sin()).collect();

    let mut model = registry.create(kind);
    model.fit(&series).unwrap();

    let forecast = model.interval_forecast(7, 68).unwrap();
    assert_eq!(forecast.horizon(), 7);
    for t in 0..7 {
        assert!(forecast.lo[t] <= forecast.mean[t]);
        assert!(forecast.mean[t] <= forecast.hi[t]);
    }
}

#[rstest]
#[case(ModelKind::AutoArima)]
#[case(ModelKind::AutoEts)]
#[case(ModelKind::HistoricAverage)]
fn test_empty_series_is_invalid_input(#[case] kind: ModelKind) {
    let registry = ModelRegistry::new(7);
    let mut model = registry.create(kind);
    let err = model.fit(&[]).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));
}

#[test]
fn test_historic_average_value() {
    let registry = ModelRegistry::new(7);
    let mut model = registry.create(ModelKind::HistoricAverage);
    model.fit(&[2.0, 4.0, 6.0, 8.0]).unwrap();

    let forecast = model.point_forecast(3).unwrap();
    for v in forecast {
        assert_approx_eq!(v, 5.0);
    }
}

#[test]
fn test_noisy_series_yields_finite_forecasts() {
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let noise = Normal::new(0.0, 2.0).unwrap();
    let series: Vec<f64> = (0..100)
        .map(|t| 50.0 + (t % 7) as f64 + noise.sample(&mut rng))
        .collect();

    let registry = ModelRegistry::new(7);
    for kind in [ModelKind::AutoArima, ModelKind::AutoEts, ModelKind::HistoricAverage] {
        let mut model = registry.create(kind);
        model.fit(&series).unwrap();
        let forecast = model.interval_forecast(14, 95).unwrap();
        assert!(forecast.mean.iter().all(|v| v.is_finite()));
        assert!(forecast.lo.iter().zip(&forecast.hi).all(|(l, h)| l < h));
    }
}
