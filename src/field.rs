use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Vacuum permeability (T·m/A).
pub const MU_0: f64 = 4.0 * std::f64::consts::PI * 1e-7;

/// Distance below which a source reports zero at its own singular point.
pub const SINGULARITY_RADIUS: f64 = 1e-10;

pub type Point = Point2<f64>;

// MARK: Field Sample
/// In-plane magnetic flux density (T) at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub bx: f64,
    pub by: f64,
}

impl FieldSample {
    pub const ZERO: FieldSample = FieldSample { bx: 0.0, by: 0.0 };

    pub fn new(bx: f64, by: f64) -> Self {
        FieldSample { bx, by }
    }

    pub fn magnitude(&self) -> f64 {
        self.bx.hypot(self.by)
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.bx, self.by)
    }

    /// Zeeman-style coupling m·B for an in-plane moment.
    pub fn dot(&self, moment: &Vector2<f64>) -> f64 {
        self.bx * moment.x + self.by * moment.y
    }
}

impl Add for FieldSample {
    type Output = FieldSample;

    fn add(self, other: FieldSample) -> FieldSample {
        FieldSample::new(self.bx + other.bx, self.by + other.by)
    }
}

impl AddAssign for FieldSample {
    fn add_assign(&mut self, other: FieldSample) {
        self.bx += other.bx;
        self.by += other.by;
    }
}

impl Sum for FieldSample {
    fn sum<I: Iterator<Item = FieldSample>>(iter: I) -> Self {
        iter.fold(FieldSample::ZERO, Add::add)
    }
}

// MARK: Potential Sample
/// Out-of-plane component of the vector potential, Az (T·m).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentialSample {
    pub az: f64,
}

impl PotentialSample {
    pub const ZERO: PotentialSample = PotentialSample { az: 0.0 };

    pub fn new(az: f64) -> Self {
        PotentialSample { az }
    }
}

impl Add for PotentialSample {
    type Output = PotentialSample;

    fn add(self, other: PotentialSample) -> PotentialSample {
        PotentialSample::new(self.az + other.az)
    }
}

impl AddAssign for PotentialSample {
    fn add_assign(&mut self, other: PotentialSample) {
        self.az += other.az;
    }
}

impl Sum for PotentialSample {
    fn sum<I: Iterator<Item = PotentialSample>>(iter: I) -> Self {
        iter.fold(PotentialSample::ZERO, Add::add)
    }
}

/// Unit vector for an angle in degrees, 0 along +x.
pub fn direction(angle_deg: f64) -> Vector2<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Vector2::new(c, s)
}
