use approx::assert_relative_eq;
use magnetic_fields::{
    DriveMode, ExtendedMagnet, FieldError, MeasurementCoil, Point, Rope, Simulation, Solenoid,
    Source,
};
use serde_json::{json, Map, Value};

fn patch(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn ramped_solenoid_induces_step_size_independent_current() {
    let ramp = 4.0; // A/s
    let solenoid = Solenoid::new(Point::origin(), 0.05, 0.2, 100.0, 0.0);
    let coil = MeasurementCoil::new(Point::origin(), 0.02, 0.02, 30.0, 5.0);
    let expected = -(coil.turns * coil.area() * solenoid.mu * solenoid.turn_density() * ramp)
        / coil.resistance;

    for &dt in &[0.002, 0.01, 0.04] {
        let mut sim = Simulation::new();
        let solenoid_id = sim.add_source(Source::Solenoid(solenoid.clone()));
        let coil_id = sim.add_source(Source::MeasurementCoil(coil.clone()));

        for _ in 0..6 {
            let current = ramp * (sim.time + dt);
            sim.update_source(solenoid_id, &patch(json!({ "current": current })))
                .unwrap();
            sim.step(dt);
        }

        let Some(Source::MeasurementCoil(c)) = sim.source(coil_id) else {
            panic!("coil missing");
        };
        assert_relative_eq!(c.induced_current, expected, max_relative = 1e-6);
    }
}

#[test]
fn static_scene_induces_nothing() {
    let mut sim = Simulation::new();
    sim.add_source(Source::Solenoid(Solenoid::default()));
    sim.add_source(Source::Magnet(ExtendedMagnet::default()));
    let coil = sim.add_source(Source::MeasurementCoil(MeasurementCoil::new(
        Point::new(0.02, 0.15),
        0.03,
        0.05,
        50.0,
        10.0,
    )));
    for _ in 0..10 {
        sim.step(1.0 / 60.0);
    }
    let Some(Source::MeasurementCoil(c)) = sim.source(coil) else {
        panic!("coil missing");
    };
    assert_eq!(c.induced_current, 0.0);
    assert!(sim.stats.induced_current.iter().all(|&i| i == 0.0));
}

#[test]
fn rope_sags_toward_a_magnet_below_it() {
    let mut sim = Simulation::new();
    sim.add_source(Source::Magnet(ExtendedMagnet::new(Point::new(0.0, -0.03), 0.1, 90.0)));
    let rope_id = sim.add_source(Source::Rope(Rope::new(Point::origin(), 0.3, 100.0, 1e-3)));

    for _ in 0..12 {
        sim.step(1.0 / 60.0);
    }

    let Some(Source::Rope(rope)) = sim.source(rope_id) else {
        panic!("rope missing");
    };
    let u = rope.displacement();
    assert_eq!(u[0], 0.0);
    assert_eq!(u[u.len() - 1], 0.0);
    assert!(u[u.len() / 2] < 0.0, "middle displacement {}", u[u.len() / 2]);
    assert!(sim.stats.rope_energy.last().copied().unwrap_or(0.0) > 0.0);
}

#[test]
fn patches_are_atomic_and_ignore_unknown_keys() {
    let mut sim = Simulation::new();
    let id = sim.add_source(Source::Magnet(ExtendedMagnet::default()));
    let probe = Point::new(0.05, 0.05);
    let before = sim.field_at(&probe);

    let rejected = sim.update_source(id, &patch(json!({ "moment": 1.0, "ny": 0 })));
    assert!(matches!(rejected, Err(FieldError::InvalidMutation { .. })));
    assert_eq!(sim.field_at(&probe), before);

    let ignored = sim
        .update_source(id, &patch(json!({ "Moment": 0.2, "label": "north" })))
        .unwrap();
    assert_eq!(ignored, vec!["label".to_string()]);
    assert_relative_eq!(sim.field_at(&probe).by, 2.0 * before.by, max_relative = 1e-12);
}

#[test]
fn removed_sources_stop_contributing() {
    let mut sim = Simulation::new();
    let solenoid = sim.add_source(Source::Solenoid(Solenoid::default()));
    let magnet = sim.add_source(Source::Magnet(ExtendedMagnet::default()));
    let probe = Point::new(0.1, 0.1);

    let removed = sim.remove_source(solenoid).unwrap();
    assert_eq!(removed.kind(), "solenoid");
    let only_magnet = sim.source(magnet).map(|s| s.field(&probe));
    assert_eq!(Some(sim.field_at(&probe)), only_magnet);
    assert!(sim.update_source(solenoid, &Map::new()).is_err());
}

#[test]
fn checkpoint_restores_dynamic_state() {
    let mut sim = Simulation::new();
    sim.drive = DriveMode::Alternating {
        frequency: 2.0,
        phase: 0.3,
    };
    sim.add_source(Source::Solenoid(Solenoid::default()));
    let coil_id = sim.add_source(Source::MeasurementCoil(MeasurementCoil::new(
        Point::new(0.0, 0.05),
        0.02,
        0.02,
        40.0,
        8.0,
    )));
    let rope_id = sim.add_source(Source::Rope(Rope::new(Point::new(0.0, 0.2), 0.2, 50.0, 1e-3)));
    let Some(Source::Rope(rope)) = sim.source_mut(rope_id) else {
        panic!("rope missing");
    };
    let profile: Vec<f64> = (0..rope.node_count()).map(|i| 1e-3 * (i as f64 * 0.7).sin()).collect();
    rope.set_displacement(&profile).unwrap();
    for _ in 0..3 {
        sim.step(0.01);
    }

    let path = std::env::temp_dir().join(format!("checkpoint_test_{}.json", std::process::id()));
    sim.save_checkpoint(&path).unwrap();
    let mut restored = Simulation::load_checkpoint(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.time, sim.time);
    assert_eq!(restored.sources(), sim.sources());
    let probe = Point::new(0.03, 0.21);
    assert_eq!(restored.field_at(&probe), sim.field_at(&probe));
    assert_eq!(restored.drive, sim.drive);

    let (Some(Source::MeasurementCoil(before)), Some(Source::MeasurementCoil(after))) =
        (sim.source(coil_id), restored.source(coil_id))
    else {
        panic!("coil missing");
    };
    assert!(before.induced_emf() != 0.0);
    assert_eq!(after.induced_emf(), before.induced_emf());
    assert_eq!(after.induced_current, before.induced_current);

    let next = restored.add_source(Source::MeasurementCoil(MeasurementCoil::default()));
    assert!(sim.sources().iter().all(|e| e.id < next));
}
