use crate::field::{direction, FieldSample, Point, PotentialSample, MU_0, SINGULARITY_RADIUS};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Point magnetic dipole in the plane. Building block for magnets and ropes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dipole {
    pub position: Point,
    /// Moment magnitude (A·m²)
    pub moment: f64,
    /// Orientation in degrees, 0 along +x
    pub angle: f64,
    pub mu: f64,
}

impl Dipole {
    pub fn new(position: Point, moment: f64, angle: f64) -> Self {
        Dipole {
            position,
            moment,
            angle,
            mu: MU_0,
        }
    }

    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    /// Moment vector (mx, my).
    pub fn moment_vector(&self) -> Vector2<f64> {
        direction(self.angle) * self.moment
    }

    /// B = μ/(4π r⁵) · [3(m·r) r − m r²]
    pub fn field(&self, point: &Point) -> FieldSample {
        let r = point - self.position;
        let r_sq = r.norm_squared();
        let dist = r_sq.sqrt();
        if dist < SINGULARITY_RADIUS {
            return FieldSample::ZERO;
        }

        let m = self.moment_vector();
        let m_dot_r = m.dot(&r);
        let prefactor = self.mu / (4.0 * PI * dist.powi(5));

        FieldSample::new(
            prefactor * (3.0 * m_dot_r * r.x - m.x * r_sq),
            prefactor * (3.0 * m_dot_r * r.y - m.y * r_sq),
        )
    }

    /// Az = μ/(4π) · (m × r)_z / r³
    pub fn potential(&self, point: &Point) -> PotentialSample {
        let r = point - self.position;
        let dist = r.norm();
        if dist < SINGULARITY_RADIUS {
            return PotentialSample::ZERO;
        }

        let m = self.moment_vector();
        PotentialSample::new(self.mu / (4.0 * PI) * (m.x * r.y - m.y * r.x) / dist.powi(3))
    }
}
