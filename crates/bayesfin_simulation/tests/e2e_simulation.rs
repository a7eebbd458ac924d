//! End-to-end: CSV history → fit → simulate → write runs → price options.

use std::io::Write;

use bayesfin_core::{load_csv, CsvSchema, FeatureConfig, FeatureEngineer, PriceFrame};
use bayesfin_models::{
    GarchArModel, MetropolisSampler, ModelSpec, PosteriorSamples, PredictiveModel, SamplerConfig,
    JUMP_SITE,
};
use bayesfin_simulation::{
    discount_factor, price_option, OptionPayoff, PathStatistics, PayoffStyle, SimRng,
    SimulationConfig, Simulator,
};

const HISTORY_LEN: usize = 120;

fn write_history(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("wti.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "date,price,winter").unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
    for i in 0..HISTORY_LEN {
        let date = start + chrono::Days::new(i as u64);
        let price = 80.0 * (1.0 + 0.02 * (i as f64 * 0.3).sin() + 0.01 * (i as f64 * 1.7).cos());
        let winter = u8::from(date.format("%m").to_string() == "12");
        writeln!(file, "{},{price:.4},{winter}", date.format("%Y-%m-%d")).unwrap();
    }
    path
}

fn setup() -> (tempfile::TempDir, PriceFrame, FeatureEngineer, GarchArModel, PosteriorSamples) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir);
    let history = load_csv(
        &path,
        &CsvSchema {
            extra_columns: vec!["winter".to_string()],
            ..CsvSchema::default()
        },
    )
    .unwrap();

    let engineer = FeatureEngineer::new(FeatureConfig {
        return_lags: 2,
        variance_window: 5,
        variance_lags: 1,
        exogenous: vec!["winter".to_string()],
    })
    .unwrap();
    let model = GarchArModel::new(
        engineer.config(),
        ModelSpec {
            jumps: true,
            ..ModelSpec::default()
        },
    );

    let features = engineer.create_features(&history).unwrap();
    let sampler = MetropolisSampler::new(
        SamplerConfig::builder()
            .n_samples(150)
            .n_warmup(150)
            .n_chains(2)
            .seed(21)
            .build()
            .unwrap(),
    );
    let posterior = sampler.sample(&model, &features).unwrap();
    (dir, history, engineer, model, posterior)
}

// ========================================
// Simulation
// ========================================

#[test]
fn test_simulate_write_and_price() {
    let (dir, history, engineer, model, posterior) = setup();
    assert_eq!(posterior.param_names(), model.param_names().as_slice());

    let simulator = Simulator::new(model, engineer)
        .with_inherit_vals(vec!["winter".to_string()])
        .with_exo_fixed_effects(vec!["winter".to_string()])
        .with_additional_effects(vec![JUMP_SITE.to_string()]);
    let config = SimulationConfig::builder()
        .n_runs(64)
        .n_steps(10)
        .seed(8)
        .build()
        .unwrap();

    let runs = simulator.simulate_paths(&history, &posterior, &config).unwrap();
    assert_eq!(runs.n_runs(), 64);
    assert_eq!(runs.history_len(), HISTORY_LEN);

    for run in runs.runs() {
        assert_eq!(run.frame.len(), HISTORY_LEN + 10);
        assert_eq!(&run.frame.prices()[..HISTORY_LEN], history.prices());
        assert!(run.frame.prices().iter().all(|p| p.is_finite() && *p > 0.0));

        let jumps = run.frame.column(JUMP_SITE).unwrap();
        assert!(jumps[..HISTORY_LEN].iter().all(|v| v.is_nan()));
        assert!(jumps[HISTORY_LEN..].iter().all(|v| *v == 0.0 || *v == 1.0));

        let winter = run.frame.column("winter").unwrap();
        let last_winter = history.column("winter").unwrap()[HISTORY_LEN - 1];
        assert!(winter[HISTORY_LEN..].iter().all(|v| *v == last_winter));
    }

    let out = dir.path().join("runs.csv");
    runs.write_csv(&out, false).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("run_id,date,price,jump,winter"));
    assert_eq!(lines.count(), 64 * 10);

    let spot = history.last_price().unwrap();
    let df = discount_factor(0.03, 10.0 / 365.0);
    let call = price_option(&runs, &OptionPayoff::call(spot), df).unwrap();
    let put = price_option(&runs, &OptionPayoff::put(spot), df).unwrap();
    assert_eq!(call.n_paths, 64);
    assert!(call.price >= 0.0 && put.price >= 0.0);
    assert!(call.confidence_95() >= 0.0);

    // Put-call parity holds path by path, hence for the sample means.
    let mean_terminal = runs.terminal_prices().iter().sum::<f64>() / runs.n_runs() as f64;
    assert!((call.price - put.price - df * (mean_terminal - spot)).abs() < 1e-9);

    let asian = OptionPayoff::call(spot).with_style(PayoffStyle::AsianArithmetic);
    assert!(price_option(&runs, &asian, df).is_ok());

    let stats = PathStatistics::from_runs(&runs, 252.0).unwrap();
    assert_eq!(stats.n_runs, 64);
    assert!(stats.terminal_q05 <= stats.terminal_median);
    assert!(stats.terminal_median <= stats.terminal_q95);
}

#[test]
fn test_runs_reproducible_and_thread_independent() {
    let (_dir, history, engineer, model, posterior) = setup();
    let simulator =
        Simulator::new(model, engineer).with_inherit_vals(vec!["winter".to_string()]);
    let config = SimulationConfig::builder()
        .n_runs(8)
        .n_steps(5)
        .seed(77)
        .build()
        .unwrap();

    let runs = simulator.simulate_paths(&history, &posterior, &config).unwrap();
    let again = simulator.simulate_paths(&history, &posterior, &config).unwrap();
    assert_eq!(runs.terminal_prices(), again.terminal_prices());

    // A single path with the derived stream matches the parallel run.
    let mut rng = SimRng::from_seed(77).derive(3);
    let single = simulator
        .simulate_path(5, &history, &posterior, &mut rng)
        .unwrap();
    assert_eq!(single.prices(), runs.runs()[3].frame.prices());
    assert_eq!(single.dates(), runs.runs()[3].frame.dates());
}

#[test]
fn test_posterior_survives_json_roundtrip() {
    let (dir, history, engineer, model, posterior) = setup();
    let path = dir.path().join("posterior.json");
    posterior.save(&path).unwrap();
    let loaded = PosteriorSamples::load(&path).unwrap();
    assert_eq!(loaded.param_names(), posterior.param_names());
    assert_eq!(loaded.n_draws(), posterior.n_draws());
    assert_eq!(loaded.n_chains(), posterior.n_chains());

    let simulator =
        Simulator::new(model, engineer).with_inherit_vals(vec!["winter".to_string()]);
    let mut rng = SimRng::from_seed(1);
    let path = simulator.simulate_path(3, &history, &loaded, &mut rng).unwrap();
    assert_eq!(path.len(), HISTORY_LEN + 3);
}
