//! Integration tests: fit → simulate → price through the command layer.

use std::io::Write;
use std::path::{Path, PathBuf};

use bayesfin_cli::commands::{self, price::PriceRequest};
use bayesfin_cli::{BayesFinConfig, CliError};

fn write_prices(dir: &Path) -> PathBuf {
    let path = dir.join("brent.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Date,Close").unwrap();
    for i in 0..90u32 {
        let month = 1 + i / 28;
        let day = 1 + i % 28;
        let price = 82.0 * (1.0 + 0.015 * (f64::from(i) * 0.45).sin() + 0.005 * (f64::from(i) * 2.1).cos());
        writeln!(file, "2024-{month:02}-{day:02},{price:.3}").unwrap();
    }
    path
}

fn config() -> BayesFinConfig {
    BayesFinConfig::from_toml_str(
        r#"
        [data]
        date_column = "Date"
        price_column = "Close"

        [sampler]
        n_samples = 100
        n_warmup = 100
        n_chains = 2
        seed = 4

        [simulation]
        n_runs = 32
        n_steps = 7
        seed = 9
        "#,
    )
    .unwrap()
}

#[test]
fn test_fit_simulate_price() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_prices(dir.path());
    let config = config();

    let posterior_path = dir.path().join("posterior.json");
    let posterior = commands::fit::run(&config, &data, &posterior_path).unwrap();
    assert!(posterior_path.exists());
    assert_eq!(posterior.n_draws(), 200);

    let runs_path = dir.path().join("runs.csv");
    let runs =
        commands::simulate::run(&config, &data, &posterior_path, &runs_path, false, "json").unwrap();
    assert_eq!(runs.n_runs(), 32);
    let written = std::fs::read_to_string(&runs_path).unwrap();
    assert_eq!(written.lines().count(), 1 + 32 * 7);

    let request = PriceRequest {
        strike: None,
        put: false,
        asian: false,
        rate: 0.05,
    };
    let report = commands::price::run(&config, &data, &posterior_path, &request, "table").unwrap();
    assert_eq!(report.payoff.strike, report.spot);
    assert_eq!(report.n_steps, 7);
    approx::assert_relative_eq!(report.discount_factor, (-0.05 * 7.0 / 252.0_f64).exp());
    assert!(report.result.price >= 0.0);
    assert_eq!(report.result.n_paths, 32);
}

#[test]
fn test_missing_inputs_and_bad_format() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    let missing = dir.path().join("missing.csv");

    let err = commands::fit::run(&config, &missing, &dir.path().join("p.json")).unwrap_err();
    assert!(matches!(err, CliError::FileNotFound(_)));

    let data = write_prices(dir.path());
    let request = PriceRequest {
        strike: Some(80.0),
        put: true,
        asian: true,
        rate: 0.0,
    };
    let err = commands::price::run(&config, &data, &missing, &request, "xml").unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument(_)));

    let err = commands::price::run(&config, &data, &missing, &request, "json").unwrap_err();
    assert!(matches!(err, CliError::FileNotFound(_)));
}

#[test]
fn test_simulate_bad_format_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_prices(dir.path());
    let config = config();
    let runs_path = dir.path().join("runs.csv");

    let err = commands::simulate::run(
        &config,
        &data,
        &dir.path().join("missing.json"),
        &runs_path,
        false,
        "xml",
    )
    .unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument(_)));
    assert!(!runs_path.exists());
}

#[test]
fn test_check_prints_valid_config() {
    assert!(commands::check::run(&config()).is_ok());
}
