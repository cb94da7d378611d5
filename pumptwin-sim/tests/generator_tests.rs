//! End-to-end generator checks.

use approx::assert_abs_diff_eq;
use pumptwin::{
    AnomalyOverride, AnomalyProbabilities, Channel, DatasetRow, PlantParams, ProfileConfig,
    TwinConfig, TwinModel, TwinState,
};
use pumptwin_sim::{generate, Dataset, SimContext, TwinGenerator};
use tempfile::NamedTempFile;

fn bits(rows: &[DatasetRow]) -> Vec<(Option<[u64; 5]>, [u64; 3], u8)> {
    rows.iter()
        .map(|r| {
            let labels = u8::from(r.labels.spike)
                | u8::from(r.labels.drift) << 1
                | u8::from(r.labels.dropout) << 2;
            (
                r.measurement.map(|m| m.values().map(f64::to_bits)),
                [
                    r.input.voltage.to_bits(),
                    r.input.load_torque.to_bits(),
                    r.input.valve.to_bits(),
                ],
                labels,
            )
        })
        .collect()
}

#[test]
fn same_seed_is_bit_identical() {
    let config = TwinConfig::default().with_steps(1000).with_seed(7);
    let a = generate(&config).unwrap();
    let b = generate(&config).unwrap();
    assert_eq!(bits(a.rows()), bits(b.rows()));

    let c = generate(&config.clone().with_seed(8)).unwrap();
    assert_ne!(bits(a.rows()), bits(c.rows()));
}

#[test]
fn independent_contexts_do_not_interfere() {
    let generator = TwinGenerator::new(TwinConfig::default().with_steps(500)).unwrap();
    let mut first = SimContext::new(3);
    let mut second = SimContext::new(3);

    let a = generator.run_with_context(&mut first).unwrap();
    let b = generator.run_with_context(&mut second).unwrap();
    assert_eq!(bits(a.rows()), bits(b.rows()));
}

#[test]
fn theta_is_non_decreasing() {
    let report = generate(&TwinConfig::default()).unwrap();
    let mut previous = TwinConfig::default().simulation.initial_state.theta;
    for x in &report.states {
        assert!(x.theta >= previous);
        assert!(x.theta >= 0.0);
        previous = x.theta;
    }
}

#[test]
fn dropout_rows_are_all_or_nothing() {
    let mut config = TwinConfig::default();
    config.anomaly.probabilities = AnomalyProbabilities {
        spike: 0.05,
        drift: 0.0,
        dropout: 0.05,
    };
    let report = generate(&config).unwrap();

    let mut dropouts = 0;
    for row in report.rows() {
        assert_eq!(row.is_dropout(), row.labels.dropout);
        if row.is_dropout() {
            dropouts += 1;
            assert!(!row.labels.spike && !row.labels.drift);
        } else {
            let m = row.measurement.unwrap();
            assert!(m.values().iter().all(|v| v.is_finite()));
        }
    }
    assert!(dropouts > 0);
}

#[test]
fn drift_label_is_sticky() {
    let mut config = TwinConfig::default();
    config.anomaly.probabilities = AnomalyProbabilities {
        spike: 0.0,
        drift: 0.01,
        dropout: 0.02,
    };
    let report = generate(&config).unwrap();

    let first = report
        .rows()
        .iter()
        .position(|r| r.labels.drift)
        .expect("drift should trigger within 3000 steps at p=0.01");
    for row in &report.rows()[first..] {
        // A dropout row carries only the dropout label
        assert!(row.labels.drift || row.labels.dropout, "step {}", row.step);
    }
}

#[test]
fn no_anomalies_means_no_labels_and_convergence() {
    let mut config = TwinConfig::default().with_steps(200).without_anomalies();
    config.profile = ProfileConfig::constant(24.0, 1.0, 0.8);
    config.plant.wear_rate = 0.0;
    let report = generate(&config).unwrap();

    assert_eq!(report.rows().len(), 200);
    assert!(report.rows().iter().all(|r| !r.labels.any()));

    let model = TwinModel::new(config.plant.clone());
    let u = report.rows()[0].input;
    let target = model.steady_state_omega(&u, config.simulation.initial_state.theta);
    // (0.08 * 24 - 1) / (0.02 + 0.15 * 0.01)
    assert_abs_diff_eq!(target, 42.7907, epsilon = 1e-3);
    assert_abs_diff_eq!(report.final_state.omega, target, epsilon = 0.5);

    let last = report.rows().last().unwrap().measurement.unwrap();
    assert_abs_diff_eq!(last.omega, target, epsilon = 1.0);
}

#[test]
fn forced_spike_scales_pressure() {
    let mut base = TwinConfig::default().with_steps(40).without_anomalies();
    base.profile = ProfileConfig::constant(24.0, 1.0, 0.8);
    let mut spiked = base.clone();
    spiked.anomaly = spiked
        .anomaly
        .with_override(AnomalyOverride::spike_at(10, Channel::Pressure));

    let clean = generate(&base).unwrap();
    let report = generate(&spiked).unwrap();

    let rows = report.rows();
    assert_eq!(bits(&rows[..10]), bits(&clean.rows()[..10]));
    assert!(rows[10].labels.spike);

    let v = clean.rows()[10].reading(Channel::Pressure).unwrap();
    let z = rows[10].reading(Channel::Pressure).unwrap();
    assert!(z == v * 4.0 || z == v * -2.0, "v={} z={}", v, z);
    assert_eq!(
        rows[10].reading(Channel::Flow),
        clean.rows()[10].reading(Channel::Flow)
    );
}

#[test]
fn forced_dropout_blanks_the_row() {
    let config = TwinConfig::default().with_steps(50);
    let mut config = config.without_anomalies();
    config.anomaly = config.anomaly.with_override(AnomalyOverride::dropout_at(25));
    let report = generate(&config).unwrap();

    for row in report.rows() {
        assert_eq!(row.is_dropout(), row.step == 25);
    }
}

#[test]
fn csv_file_roundtrip() {
    for dt in [0.1, 0.005, 0.333, 2.0] {
        let mut config = TwinConfig::default().with_steps(500);
        config.simulation.dt = dt;
        let report = generate(&config).unwrap();
        let file = NamedTempFile::new().unwrap();

        report.dataset.to_csv(file.path()).unwrap();
        let loaded = Dataset::from_csv(file.path()).unwrap();

        assert_eq!(loaded.rows, report.dataset.rows, "dt={}", dt);
    }
}

#[test]
fn default_state_starts_at_rest() {
    let config = TwinConfig::default();
    assert_eq!(config.simulation.initial_state, TwinState::new(0.0, 0.01, 25.0));
    assert_eq!(config.plant, PlantParams::default());
}
