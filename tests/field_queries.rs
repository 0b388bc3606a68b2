use approx::assert_relative_eq;
use magnetic_fields::{
    Dipole, ExtendedMagnet, FieldSample, GridSpec, MeasurementCoil, Point, PotentialSample, Rope,
    Simulation, Solenoid, Source, MU_0,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn mixed_scene() -> (Simulation, Vec<Source>) {
    let sources = vec![
        Source::Solenoid(Solenoid::new(Point::new(-0.05, 0.0), 0.04, 0.15, 80.0, 1.5)),
        Source::Magnet(ExtendedMagnet::new(Point::new(0.1, -0.05), 0.2, 30.0)),
        Source::MeasurementCoil(MeasurementCoil::default()),
        Source::Rope(Rope::new(Point::new(0.0, 0.2), 0.2, 50.0, 5e-4)),
    ];
    let mut sim = Simulation::new();
    for source in &sources {
        sim.add_source(source.clone());
    }
    (sim, sources)
}

#[test]
fn field_is_the_sum_of_individual_sources() {
    let (sim, sources) = mixed_scene();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let p = Point::new(rng.random_range(-0.3..0.3), rng.random_range(-0.3..0.3));
        let expected: FieldSample = sources.iter().map(|s| s.field(&p)).sum();
        let actual = sim.field_at(&p);
        assert_relative_eq!(actual.bx, expected.bx, epsilon = 1e-15, max_relative = 1e-12);
        assert_relative_eq!(actual.by, expected.by, epsilon = 1e-15, max_relative = 1e-12);

        let expected_az: PotentialSample = sources.iter().map(|s| s.potential(&p)).sum();
        assert_relative_eq!(sim.potential_at(&p).az, expected_az.az, epsilon = 1e-15, max_relative = 1e-12);
    }
}

#[test]
fn queries_never_return_non_finite_values() {
    let (sim, _) = mixed_scene();
    let probes = [
        Point::new(0.1, -0.05),
        Point::new(-0.05, 0.0),
        Point::new(-0.01, 0.075),
        Point::new(-0.09, -0.075),
        Point::new(0.0, 0.2),
    ];
    for p in &probes {
        let b = sim.field_at(p);
        assert!(b.bx.is_finite() && b.by.is_finite(), "field at {p:?}");
        assert!(sim.potential_at(p).az.is_finite(), "potential at {p:?}");
    }
}

#[test]
fn short_solenoid_center_scenario() {
    let mut sim = Simulation::new();
    sim.add_source(Source::Solenoid(Solenoid::new(Point::origin(), 0.05, 0.1, 100.0, 2.0)));
    let expected = MU_0 * (100.0 / 0.1) * 2.0;
    let b = sim.field_at(&Point::origin());
    assert!((b.by - expected).abs() / expected < 0.05, "By = {}", b.by);
}

#[test]
fn dipole_field_falls_off_as_inverse_cube() {
    let dipole = Dipole::new(Point::new(0.02, -0.01), 0.3, 60.0);
    let ray = [0.6_f64.cos(), 0.6_f64.sin()];
    let scaled = |r: f64| {
        let p = Point::new(0.02 + r * ray[0], -0.01 + r * ray[1]);
        dipole.field(&p).magnitude() * r.powi(3)
    };
    assert_relative_eq!(scaled(0.05), scaled(0.5), max_relative = 1e-9);
    assert_relative_eq!(scaled(0.05), scaled(2.0), max_relative = 1e-9);
}

#[test]
fn grid_points_follow_row_major_layout() {
    let (sim, _) = mixed_scene();
    let grid = GridSpec::new(-0.2, 0.2, -0.1, 0.3, 5);
    let field = sim.field_grid(&grid).unwrap();
    for (i, row) in field.iter().enumerate() {
        for (j, b) in row.iter().enumerate() {
            let p = Point::new(-0.2 + j as f64 * 0.1, -0.1 + i as f64 * 0.1);
            let direct = sim.field_at(&p);
            assert_relative_eq!(b.bx, direct.bx, epsilon = 1e-15, max_relative = 1e-9);
            assert_relative_eq!(b.by, direct.by, epsilon = 1e-15, max_relative = 1e-9);
        }
    }
}
