use chrono::Duration;
use sensor_forecast::cross_validator::{errors_to_dataframe, CrossValidator};
use sensor_forecast::data::DataLoader;
use sensor_forecast::forecaster::Forecaster;
use sensor_forecast::{ForecastError, Frequency, MetricKind};
use std::io::Write;
use tempfile::NamedTempFile;

// Helper function to create two sensors with 30 days of clean trend data
fn create_sample_data() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    writeln!(file, "unique_id,ds,y").unwrap();
    for entity_id in [1, 2] {
        for t in 0..30 {
            writeln!(
                file,
                "{},2023-01-{:02},{:.1}",
                entity_id,
                t + 1,
                entity_id as f64 * 50.0 + t as f64
            )
            .unwrap();
        }
    }

    file
}

#[test]
fn test_full_selection_and_forecast_workflow() {
    // 1. Load the long-format history
    let data_file = create_sample_data();
    let history = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(history.len(), 60);
    assert_eq!(history.entity_ids(), vec![1, 2]);

    // 2. Select the best model per entity under a rolling backtest
    let mut cv = CrossValidator::new(vec!["HistoricAverage".to_string()], Frequency::Daily)
        .with_horizon(7)
        .with_folds(2)
        .with_season_length(14)
        .with_metric(MetricKind::Mae);
    let decisions = cv.fit_transform(&history).unwrap();

    assert_eq!(decisions.len(), 4);
    assert!(decisions.iter().all(|d| d.best_model == "HistoricAverage"));

    // 3. The diagnostic error matrix is available after transform
    let error_table = cv.error_table().unwrap();
    assert_eq!(error_table.len(), 4);
    assert!(error_table
        .iter()
        .all(|r| r.errors[0].0 == "mae_HistoricAverage" && r.errors[0].1 > 0.0));
    let error_df = errors_to_dataframe(error_table).unwrap();
    assert_eq!(
        error_df.get_column_names(),
        vec!["unique_id", "cutoff", "best_model", "mae_HistoricAverage"]
    );

    // 4. Forecast using the most recent valid decision per entity
    let mut forecaster = Forecaster::new(decisions, Frequency::Daily, vec![68])
        .unwrap()
        .with_horizon(7)
        .with_season_length(14);
    let forecasts = forecaster.fit_predict(&history).unwrap();

    let max_ts = history.max_timestamp().unwrap();
    assert!(forecaster.decisions().iter().all(|d| d.start_date <= max_ts));

    // 5. Seven rows per entity, continuing each grid the day after history
    assert_eq!(forecasts.len(), 14);
    for entity_id in [1, 2] {
        let rows: Vec<_> = forecasts
            .records()
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].timestamp, max_ts + Duration::days(1));
        for pair in rows.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    // 6. The output table carries level-qualified interval columns
    let df = forecasts.to_dataframe().unwrap();
    assert_eq!(
        df.get_column_names(),
        vec!["unique_id", "ds", "prediction", "prediction-lo-68", "prediction-hi-68"]
    );
    assert_eq!(df.height(), 14);

    // 7. Test error handling
    let result = DataLoader::from_csv("/nonexistent/path.csv");
    assert!(matches!(result.unwrap_err(), ForecastError::IoError(_)));
}

#[test]
fn test_parallel_workflow_matches_serial() {
    let data_file = create_sample_data();
    let history = DataLoader::from_csv(data_file.path()).unwrap();

    let candidates = vec![
        "AutoARIMA".to_string(),
        "AutoETS".to_string(),
        "HistoricAverage".to_string(),
    ];

    let mut serial = CrossValidator::new(candidates.clone(), Frequency::Daily)
        .with_folds(2)
        .with_season_length(14);
    let serial_decisions = serial.fit_transform(&history).unwrap();

    let mut parallel = CrossValidator::new(candidates, Frequency::Daily)
        .with_folds(2)
        .with_season_length(14)
        .with_jobs(4);
    let parallel_decisions = parallel.fit_transform(&history).unwrap();
    assert_eq!(serial_decisions, parallel_decisions);

    let mut forecaster = Forecaster::new(serial_decisions, Frequency::Daily, vec![95])
        .unwrap()
        .with_season_length(14)
        .with_jobs(4);
    let forecasts = forecaster.fit_predict(&history).unwrap();
    assert_eq!(forecasts.len(), 14);
}
