//! Flexible dipole chain ("rope") and its transverse wave mechanics.
//!
//! The rope is a horizontal string clamped at both ends, carrying evenly
//! spaced magnetic dipoles. Each dipole aligns with the local external field;
//! the field gradient then pulls the string, which is integrated with an
//! explicit finite-difference scheme for the damped wave equation.

use crate::dipole::Dipole;
use crate::error::{FieldError, Result};
use crate::field::{FieldSample, Point, PotentialSample, MU_0};
use crate::sources::ExternalField;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Longest frame step integrated in one call (s).
pub const MAX_FRAME_STEP: f64 = 0.02;
/// Most dipoles a single rope carries.
pub const MAX_NODES: usize = 100_000;
/// Courant number used for sub-stepping.
const COURANT: f64 = 0.5;
/// Offset for the central-difference field gradient (m).
const GRADIENT_STEP: f64 = 1e-5;
/// Fields weaker than this leave a dipole's orientation unchanged.
const ALIGNMENT_THRESHOLD: f64 = 1e-15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rope {
    /// Midpoint of the rope at rest
    center: Point,
    length: f64,
    /// Dipoles per meter
    density: f64,
    /// Moment of each dipole (A·m²)
    dipole_moment: f64,
    mu: f64,
    /// Tension (N)
    tension: f64,
    /// Linear mass density (kg/m)
    linear_density: f64,
    /// Viscous damping coefficient (kg/(m·s))
    damping: f64,
    displacement: Vec<f64>,
    velocity: Vec<f64>,
    angles: Vec<f64>,
}

impl Default for Rope {
    fn default() -> Self {
        Rope::new(Point::origin(), 0.3, 100.0, 1e-3)
    }
}

impl Rope {
    pub fn new(center: Point, length: f64, density: f64, dipole_moment: f64) -> Self {
        let mut rope = Rope {
            center,
            length,
            density,
            dipole_moment,
            mu: MU_0,
            tension: 1.0,
            linear_density: 0.01,
            damping: 0.05,
            displacement: Vec::new(),
            velocity: Vec::new(),
            angles: Vec::new(),
        };
        rope.sync_nodes();
        rope
    }

    pub fn with_mechanics(mut self, tension: f64, linear_density: f64, damping: f64) -> Self {
        self.tension = tension;
        self.linear_density = linear_density;
        self.damping = damping;
        self
    }

    // MARK: Parameters
    pub fn center(&self) -> Point {
        self.center
    }
    pub fn length(&self) -> f64 {
        self.length
    }
    pub fn density(&self) -> f64 {
        self.density
    }
    pub fn dipole_moment(&self) -> f64 {
        self.dipole_moment
    }
    pub fn mu(&self) -> f64 {
        self.mu
    }
    pub fn tension(&self) -> f64 {
        self.tension
    }
    pub fn linear_density(&self) -> f64 {
        self.linear_density
    }
    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.sync_nodes();
    }
    pub fn set_density(&mut self, density: f64) {
        self.density = density;
        self.sync_nodes();
    }
    pub fn set_dipole_moment(&mut self, moment: f64) {
        self.dipole_moment = moment;
    }
    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
    }
    pub fn set_tension(&mut self, tension: f64) {
        self.tension = tension;
    }
    pub fn set_linear_density(&mut self, linear_density: f64) {
        self.linear_density = linear_density;
    }
    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }

    /// Number of dipoles, round(L·ρ).
    /// Capped at [`MAX_NODES`].
    pub fn node_count(&self) -> usize {
        let count = (self.length * self.density).round();
        if count.is_finite() && count > 0.0 {
            (count as usize).min(MAX_NODES)
        } else {
            0
        }
    }

    /// Resize the state arrays when the node count no longer matches.
    /// A resized rope starts at rest with all dipoles along +x.
    pub(crate) fn sync_nodes(&mut self) {
        let n = self.node_count();
        if self.displacement.len() != n || self.velocity.len() != n || self.angles.len() != n {
            self.displacement = vec![0.0; n];
            self.velocity = vec![0.0; n];
            self.angles = vec![0.0; n];
        }
    }

    // MARK: Dipole chain
    pub fn spacing(&self) -> f64 {
        self.length / self.node_count().max(1) as f64
    }

    fn rest_x(&self, i: usize) -> f64 {
        self.center.x - self.length / 2.0 + (i as f64 + 0.5) * self.spacing()
    }

    pub fn node_position(&self, i: usize) -> Point {
        Point::new(self.rest_x(i), self.center.y + self.displacement[i])
    }

    pub fn dipole(&self, i: usize) -> Dipole {
        Dipole::new(self.node_position(i), self.dipole_moment, self.angles[i]).with_mu(self.mu)
    }

    pub fn dipoles(&self) -> impl Iterator<Item = Dipole> + '_ {
        (0..self.displacement.len()).map(move |i| self.dipole(i))
    }

    pub fn displacement(&self) -> &[f64] {
        &self.displacement
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn field(&self, point: &Point) -> FieldSample {
        self.dipoles().map(|d| d.field(point)).sum()
    }

    pub fn potential(&self, point: &Point) -> PotentialSample {
        self.dipoles().map(|d| d.potential(point)).sum()
    }

    // MARK: Alignment
    /// Turn every dipole to the direction of the external field at its node.
    pub fn update_alignment(&mut self, external: &ExternalField) {
        for i in 0..self.angles.len() {
            let b = external.field_at(&self.node_position(i));
            if b.magnitude() > ALIGNMENT_THRESHOLD {
                self.angles[i] = b.by.atan2(b.bx).to_degrees();
            }
        }
    }

    /// Magnetic body force per unit length on each node, ρ·∂(m·B)/∂y.
    /// Endpoints carry no force.
    pub fn magnetic_force(&self, external: &ExternalField) -> Vec<f64> {
        let n = self.displacement.len();
        let mut force = vec![0.0; n];
        if n < 3 {
            return force;
        }
        for (i, f) in force.iter_mut().enumerate().take(n - 1).skip(1) {
            let moment = self.dipole(i).moment_vector();
            let node = self.node_position(i);
            let offset = Vector2::new(0.0, GRADIENT_STEP);
            let above = external.field_at(&(node + offset)).dot(&moment);
            let below = external.field_at(&(node - offset)).dot(&moment);
            *f = self.density * (above - below) / (2.0 * GRADIENT_STEP);
        }
        force
    }

    // MARK: Mechanics
    /// Advance the damped wave equation by `dt`, sub-stepping to stay within
    /// the CFL limit. The magnetic force is sampled once per call.
    pub fn step_mechanics(&mut self, external: &ExternalField, dt: f64) {
        let n = self.displacement.len();
        if n < 3 || !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        let dt = dt.min(MAX_FRAME_STEP);

        let c_sq = self.tension / self.linear_density;
        if !(c_sq > 0.0) || !c_sq.is_finite() {
            return;
        }
        let dx = self.spacing();
        let max_sub_dt = COURANT * dx / c_sq.sqrt();
        let substeps = (dt / max_sub_dt).ceil().max(1.0) as usize;
        let sub_dt = dt / substeps as f64;
        log::trace!("rope step: dt={dt:.4e}, {substeps} substeps of {sub_dt:.3e}s");

        let force = self.magnetic_force(external);
        let damping_rate = self.damping / self.linear_density;
        let inv_dx_sq = 1.0 / (dx * dx);

        // Jacobi sweeps: each sweep reads only the previous buffers.
        let mut next_u = vec![0.0; n];
        let mut next_v = vec![0.0; n];
        for _ in 0..substeps {
            let u = &self.displacement;
            let v = &self.velocity;
            for i in 1..n - 1 {
                let laplacian = (u[i + 1] - 2.0 * u[i] + u[i - 1]) * inv_dx_sq;
                let accel =
                    c_sq * laplacian - damping_rate * v[i] + force[i] / self.linear_density;
                next_v[i] = v[i] + accel * sub_dt;
                next_u[i] = u[i] + next_v[i] * sub_dt;
            }
            std::mem::swap(&mut self.displacement, &mut next_u);
            std::mem::swap(&mut self.velocity, &mut next_v);
        }
    }

    /// Put the rope back at rest on its axis.
    pub fn reset_mechanics(&mut self) {
        self.displacement.iter_mut().for_each(|u| *u = 0.0);
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Impose a displacement profile. Endpoints are forced back to zero.
    pub fn set_displacement(&mut self, profile: &[f64]) -> Result<()> {
        if profile.len() != self.displacement.len() {
            return Err(FieldError::invalid(
                "displacement",
                format!("expected {} values, got {}", self.displacement.len(), profile.len()),
            ));
        }
        if profile.iter().any(|u| !u.is_finite()) {
            return Err(FieldError::invalid("displacement", "values must be finite"));
        }
        self.displacement.copy_from_slice(profile);
        if let Some(first) = self.displacement.first_mut() {
            *first = 0.0;
        }
        if let Some(last) = self.displacement.last_mut() {
            *last = 0.0;
        }
        Ok(())
    }

    /// Kinetic plus elastic energy of the string (J).
    pub fn mechanical_energy(&self) -> f64 {
        let dx = self.spacing();
        let kinetic: f64 = self
            .velocity
            .iter()
            .map(|v| 0.5 * self.linear_density * v * v * dx)
            .sum();
        let elastic: f64 = self
            .displacement
            .windows(2)
            .map(|w| {
                let slope = (w[1] - w[0]) / dx;
                0.5 * self.tension * slope * slope * dx
            })
            .sum();
        kinetic + elastic
    }
}
