use assert_approx_eq::assert_approx_eq;
use rstest::rstest;
use sensor_forecast::metrics::{
    mean_absolute_error, mean_absolute_percentage_error, root_mean_squared_error, MetricKind,
    MetricRegistry,
};
use sensor_forecast::ForecastError;

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    let mae = mean_absolute_error(&actual, &predicted).unwrap();
    assert_approx_eq!(mae, 2.4, 0.01);

    let rmse = root_mean_squared_error(&actual, &predicted).unwrap();
    assert_approx_eq!(rmse, 2.449, 0.01);

    let mape = mean_absolute_percentage_error(&actual, &predicted).unwrap();
    assert!(mape > 0.0 && mape < 0.15);
}

#[rstest]
#[case(MetricKind::Mae)]
#[case(MetricKind::Mape)]
#[case(MetricKind::Rmse)]
fn test_identical_sequences_score_zero(#[case] metric: MetricKind) {
    let x = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0];
    let score = metric.evaluate(&x, &x).unwrap();
    assert_eq!(score, 0.0);
}

#[rstest]
#[case(MetricKind::Mae)]
#[case(MetricKind::Mape)]
#[case(MetricKind::Rmse)]
fn test_malformed_input_fails_loudly(#[case] metric: MetricKind) {
    // Empty sequences
    let err = metric.evaluate(&[], &[]).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));

    // Mismatched lengths
    let err = metric.evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidInput(_)));
}

#[test]
fn test_registry_resolves_identifiers() {
    assert_eq!("mae".parse::<MetricKind>().unwrap(), MetricKind::Mae);
    assert_eq!("mape".parse::<MetricKind>().unwrap(), MetricKind::Mape);
    assert_eq!("rmse".parse::<MetricKind>().unwrap(), MetricKind::Rmse);

    let err = "mse".parse::<MetricKind>().unwrap_err();
    assert!(matches!(err, ForecastError::UnknownMetric(_)));
}

#[test]
fn test_registry_functions_agree_with_free_functions() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![2.0, 2.0, 2.0];

    let f = MetricRegistry::get(MetricKind::Rmse);
    assert_eq!(
        f(&actual, &predicted).unwrap(),
        root_mean_squared_error(&actual, &predicted).unwrap()
    );
}
