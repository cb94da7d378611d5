//! Property checks for the twin model over randomised inputs.

use pumptwin::config::HydraulicParams;
use pumptwin::{cavitation_factor, ControlInput, PlantParams, TwinModel, TwinState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_input(rng: &mut StdRng) -> ControlInput {
    ControlInput::new(
        rng.gen_range(-50.0..50.0),
        rng.gen_range(-5.0..5.0),
        rng.gen_range(-0.5..1.5),
    )
}

#[test]
fn theta_never_decreases() {
    let model = TwinModel::new(PlantParams::default());
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let mut x = TwinState::new(
            rng.gen_range(-300.0..300.0),
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.0..90.0),
        );
        for _ in 0..500 {
            let next = model.fx(&x, &random_input(&mut rng), 0.1);
            assert!(
                next.theta >= x.theta,
                "theta decreased from {} to {}",
                x.theta,
                next.theta
            );
            assert!(next.theta >= 0.0);
            x = next;
        }
    }
}

#[test]
fn cavitation_factor_at_least_one() {
    let h = HydraulicParams::default();
    let mut rng = StdRng::seed_from_u64(11);

    for i in 0..=100 {
        for j in 0..=20 {
            let omega = i as f64 * 10.0;
            let valve = j as f64 / 20.0;
            assert!(cavitation_factor(omega, valve, &h) >= 1.0);
        }
    }

    for _ in 0..10_000 {
        let omega = rng.gen_range(0.0..5_000.0);
        let valve = rng.gen_range(0.0..=1.0);
        assert!(cavitation_factor(omega, valve, &h) >= 1.0);
    }
}

#[test]
fn flow_never_exceeds_uncavitated_flow() {
    let model = TwinModel::default();
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..5_000 {
        let x = TwinState::new(rng.gen_range(0.0..1_000.0), 0.01, 25.0);
        let u = ControlInput::new(24.0, 1.0, rng.gen_range(0.0..=1.0));
        let y = model.hx(&x, &u);
        let open_flow = 0.36 * x.omega * u.valve;
        assert!(y.flow <= open_flow + 1e-9);
    }
}
