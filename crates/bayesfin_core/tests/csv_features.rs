//! Integration tests: CSV file loading through feature construction.

use std::collections::BTreeMap;
use std::io::Write;

use bayesfin_core::{
    append_log_return, load_csv, write_csv, CsvSchema, DataError, DateStep, FeatureConfig,
    FeatureEngineer,
};

fn write_sample(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("brent.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Date,Close,winter").unwrap();
    for i in 0..40 {
        let day = 1 + i % 28;
        let month = 1 + i / 28;
        let price = 75.0 + 2.0 * ((i as f64) * 0.4).sin();
        let winter = if month == 1 { 1 } else { 0 };
        writeln!(file, "2024-{month:02}-{day:02},{price:.4},{winter}").unwrap();
    }
    path
}

fn schema() -> CsvSchema {
    CsvSchema {
        date_column: "Date".to_string(),
        price_column: "Close".to_string(),
        extra_columns: vec!["winter".to_string()],
        ..CsvSchema::default()
    }
}

#[test]
fn test_load_build_features_and_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir);

    let frame = load_csv(&path, &schema()).unwrap();
    assert_eq!(frame.len(), 40);

    let engineer = FeatureEngineer::new(FeatureConfig {
        return_lags: 2,
        variance_window: 5,
        variance_lags: 1,
        exogenous: vec!["winter".to_string()],
    })
    .unwrap();
    let features = engineer.create_features(&frame).unwrap();
    assert_eq!(features.len(), 40 - engineer.required_history());
    assert!(features.target().iter().all(|r| r.is_finite()));

    let out = dir.path().join("out.csv");
    write_csv(&out, &frame).unwrap();
    let reloaded = load_csv(
        &out,
        &CsvSchema {
            extra_columns: vec!["winter".to_string()],
            ..CsvSchema::default()
        },
    )
    .unwrap();
    assert_eq!(reloaded, frame);
}

#[test]
fn test_rollout_keeps_features_defined_with_inherited_exogenous() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = load_csv(write_sample(&dir), &schema()).unwrap();
    let engineer = FeatureEngineer::new(FeatureConfig {
        exogenous: vec!["winter".to_string()],
        ..FeatureConfig::default()
    })
    .unwrap();

    for step in 0..10 {
        let r = if step % 2 == 0 { 0.01 } else { -0.008 };
        append_log_return(
            &mut frame,
            r,
            &["winter".to_string()],
            &BTreeMap::new(),
            DateStep::Weekdays,
        )
        .unwrap();
        let row = engineer.latest_features(&frame).unwrap();
        assert!(row.values().all(|v| v.is_finite()));
    }
    assert_eq!(frame.len(), 50);
}

#[test]
fn test_load_missing_file() {
    let result = load_csv("/nonexistent/prices.csv", &CsvSchema::default());
    assert!(matches!(result, Err(DataError::Io(_))));
}
