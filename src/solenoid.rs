//! Finite solenoid with its axis along y.
//!
//! The field is the difference of two semi-infinite solenoid solutions
//! evaluated at the ends, written in terms of complete elliptic integrals and
//! Heuman's Lambda function.

use crate::elliptic::{complete_pair, heuman_lambda};
use crate::field::{FieldSample, Point, PotentialSample, MU_0, SINGULARITY_RADIUS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Most discrete loops summed for the vector potential.
pub const MAX_POTENTIAL_LOOPS: usize = 100_000;

const MAX_K_SQUARED: f64 = 0.9999;
const MIN_K: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Solenoid {
    pub center: Point,
    pub radius: f64,
    pub length: f64,
    pub turns: f64,
    /// Instantaneous current (A)
    pub current: f64,
    /// Steady-state amplitude the drive modulates
    pub base_current: f64,
    pub mu: f64,
}

impl Default for Solenoid {
    fn default() -> Self {
        Solenoid::new(Point::origin(), 0.05, 0.20, 100.0, 2.0)
    }
}

// MARK: Elliptic helpers
/// Elliptic modulus k for a coil of radius `a` seen from radial distance `r`
/// at axial offset `ksi`.
pub(crate) fn modulus(a: f64, r: f64, ksi: f64) -> f64 {
    let mut denom = ksi * ksi + (a + r) * (a + r);
    if denom == 0.0 {
        denom = 1e-12;
    }
    (4.0 * a * r / denom).clamp(0.0, MAX_K_SQUARED).sqrt()
}

fn heuman_angle(r: f64, a: f64, ksi: f64) -> f64 {
    (ksi / (a - r)).abs().atan()
}

/// Radial field of a semi-infinite solenoid ending at offset `ksi`.
fn radial_term(a: f64, r: f64, ksi: f64) -> f64 {
    let k = modulus(a, r, ksi).max(MIN_K);
    let k_sq = k * k;
    let (big_k, big_e) = complete_pair(k_sq);
    (a / r).sqrt() * (((2.0 - k_sq) / (2.0 * k)) * big_k - big_e / k) / PI
}

/// Axial field of a semi-infinite solenoid ending at offset `ksi`.
fn axial_term(a: f64, r: f64, ksi: f64) -> f64 {
    let k = modulus(a, r, ksi).max(MIN_K);
    let (big_k, _) = complete_pair(k * k);
    let sqrt_ar = (a * r).sqrt().max(1e-10);

    let elliptic_part = ksi * k / (PI * sqrt_ar) * big_k;

    // sign((a − r)·ξ); an exact zero drops the Lambda term
    let product = (a - r) * ksi;
    let lambda_part = if product == 0.0 {
        0.0
    } else {
        product.signum() * heuman_lambda(heuman_angle(r, a, ksi), k)
    };

    (elliptic_part + lambda_part) / 4.0
}

// MARK: Loop potential
/// A_φ of one circular loop of radius `a` at axial offset `z`.
pub(crate) fn loop_vector_potential(a: f64, mu: f64, current: f64, r: f64, z: f64) -> f64 {
    if r < SINGULARITY_RADIUS {
        return 0.0;
    }
    let k = modulus(a, r, z);
    if k < MIN_K {
        return 0.0;
    }
    let k_sq = k * k;
    let (big_k, big_e) = complete_pair(k_sq);
    (mu * current / (PI * k)) * (a / r).sqrt() * ((1.0 - k_sq / 2.0) * big_k - big_e)
}

impl Solenoid {
    pub fn new(center: Point, radius: f64, length: f64, turns: f64, current: f64) -> Self {
        Solenoid {
            center,
            radius,
            length,
            turns,
            current,
            base_current: current,
            mu: MU_0,
        }
    }

    /// Turns per unit length.
    pub fn turn_density(&self) -> f64 {
        self.turns / self.length
    }

    /// Ideal long-solenoid interior field μnI.
    pub fn ideal_field(&self) -> f64 {
        self.mu * self.turn_density() * self.current
    }

    fn axis_side(&self, x: f64) -> f64 {
        let dx = x - self.center.x;
        if dx == 0.0 { 1.0 } else { dx.signum() }
    }

    /// Cylindrical components (Br, Bz) at radial distance r and axial offset z.
    pub fn cylindrical_field(&self, r: f64, z: f64) -> (f64, f64) {
        if r < SINGULARITY_RADIUS {
            return (0.0, self.ideal_field());
        }
        let a = self.radius;
        let scale = self.mu * self.turn_density() * self.current;
        let ksi_low = z - self.length / 2.0;
        let ksi_high = z + self.length / 2.0;

        let br = scale * (radial_term(a, r, ksi_high) - radial_term(a, r, ksi_low));
        let bz = scale * (axial_term(a, r, ksi_high) - axial_term(a, r, ksi_low));
        (br, bz)
    }

    pub fn field(&self, point: &Point) -> FieldSample {
        let r = (point.x - self.center.x).abs();
        let z = point.y - self.center.y;
        let (br, bz) = self.cylindrical_field(r, z);
        FieldSample::new(-br * self.axis_side(point.x), bz)
    }

    /// Vector potential from `turns` discrete loops spread over the length.
    pub fn potential(&self, point: &Point) -> PotentialSample {
        let r = (point.x - self.center.x).abs();
        if r < SINGULARITY_RADIUS {
            return PotentialSample::ZERO;
        }
        let z = point.y - self.center.y;
        let loops = (self.turns.round().max(1.0) as usize).min(MAX_POTENTIAL_LOOPS);
        let spacing = self.length / loops as f64;

        let a_phi: f64 = (0..loops)
            .map(|j| {
                let offset = -self.length / 2.0 + (j as f64 + 0.5) * spacing;
                loop_vector_potential(self.radius, self.mu, self.current, r, z - offset)
            })
            .sum();

        PotentialSample::new(-a_phi * self.axis_side(point.x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn short_solenoid_center_matches_ideal_baseline() {
        let coil = Solenoid::new(Point::new(0.0, 0.0), 0.05, 0.1, 100.0, 2.0);
        let expected = MU_0 * (100.0 / 0.1) * 2.0;
        let b = coil.field(&coil.center);
        assert!((b.by - expected).abs() / expected < 0.05);
        assert_eq!(b.bx, 0.0);
    }

    #[test]
    fn long_solenoid_interior_approaches_ideal_field() {
        let coil = Solenoid::new(Point::new(0.2, -0.1), 0.01, 1.0, 1000.0, 1.5);
        let near_axis = Point::new(0.2 + 1e-3, -0.1);
        let b = coil.field(&near_axis);
        assert_relative_eq!(b.by, coil.ideal_field(), max_relative = 0.02);
        assert!(b.bx.abs() < 0.02 * coil.ideal_field());
    }

    #[test]
    fn radial_component_vanishes_on_axis() {
        let coil = Solenoid::new(Point::new(0.03, 0.0), 0.05, 0.2, 50.0, 1.0);
        for i in -10..=10 {
            let p = Point::new(0.03, i as f64 * 0.05);
            assert_eq!(coil.field(&p).bx, 0.0);
        }
    }

    #[test]
    fn radial_component_is_mirror_antisymmetric() {
        let coil = Solenoid::new(Point::new(0.0, 0.0), 0.05, 0.2, 100.0, 2.0);
        for &(dx, y) in &[(0.02, 0.09), (0.08, 0.15), (0.12, -0.05)] {
            let right = coil.field(&Point::new(dx, y));
            let left = coil.field(&Point::new(-dx, y));
            assert_relative_eq!(right.bx, -left.bx, max_relative = 1e-12);
            assert_relative_eq!(right.by, left.by, max_relative = 1e-12);
        }
    }

    #[test]
    fn field_is_finite_on_the_winding() {
        let coil = Solenoid::default();
        let samples = [
            Point::new(coil.radius, 0.0),
            Point::new(coil.radius, coil.length / 2.0),
            Point::new(-coil.radius, -coil.length / 2.0),
            Point::new(0.3, 0.4),
        ];
        for p in &samples {
            let b = coil.field(p);
            assert!(b.bx.is_finite() && b.by.is_finite(), "non-finite at {p:?}");
            assert!(coil.potential(p).az.is_finite());
        }
    }

    #[test]
    fn exact_axis_reports_ideal_field() {
        let coil = Solenoid::default();
        for &y in &[0.0, 0.3, 3.0] {
            let b = coil.field(&Point::new(0.0, y));
            assert_eq!(b.by, coil.ideal_field());
        }
    }

    #[test]
    fn field_stays_finite_at_extreme_distances() {
        let coil = Solenoid::default();
        let points = [
            Point::new(coil.radius + 1e-6, 1e8),
            Point::new(coil.radius - 1e-6, -1e8),
            Point::new(1e6, 1e6),
            Point::new(-1e-3, 1e12),
        ];
        for p in &points {
            let b = coil.field(p);
            assert!(b.bx.is_finite() && b.by.is_finite(), "{b:?} at {p:?}");
            assert!(coil.potential(p).az.is_finite());
        }
    }

    #[test]
    fn potential_loop_count_is_capped() {
        let mut coil = Solenoid::default();
        coil.turns = 1e12;
        let az = coil.potential(&Point::new(0.03, 0.01)).az;
        assert!(az.is_finite() && az != 0.0);
    }

    #[test]
    fn field_decays_far_from_the_coil() {
        let coil = Solenoid::default();
        let near = coil.field(&Point::new(1e-4, 0.3)).magnitude();
        let far = coil.field(&Point::new(1e-4, 3.0)).magnitude();
        assert!(far < near * 1e-2);
    }

    #[test]
    fn potential_vanishes_on_axis_and_flips_sign_across_it() {
        let coil = Solenoid::default();
        assert_eq!(coil.potential(&Point::new(0.0, 0.05)).az, 0.0);
        let right = coil.potential(&Point::new(0.03, 0.02));
        let left = coil.potential(&Point::new(-0.03, 0.02));
        assert_relative_eq!(right.az, -left.az, max_relative = 1e-12);
        assert!(right.az != 0.0);
    }

    #[test]
    fn single_loop_potential_is_positive_for_positive_current() {
        let a_phi = loop_vector_potential(0.05, MU_0, 1.0, 0.04, 0.01);
        assert!(a_phi > 0.0);
        assert_eq!(loop_vector_potential(0.05, MU_0, 1.0, 0.0, 0.01), 0.0);
    }
}
