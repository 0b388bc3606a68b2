use crate::dipole::Dipole;
use crate::field::{direction, FieldSample, Point, PotentialSample, MU_0};
use nalgebra::Vector2;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Largest dipole grid a magnet will build (nx·ny).
pub const MAX_GRID_DIPOLES: usize = 10_000;

/// Permanent magnet modelled as a rectangular grid of point dipoles.
///
/// The dipole grid is derived state. Every setter drops it and the next
/// field or potential query rebuilds it, so a stale grid is never read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedMagnet {
    center: Point,
    /// Half-width across the magnetization axis
    radius: f64,
    /// Extent along the magnetization axis
    length: f64,
    nx: usize,
    ny: usize,
    /// Total moment (A·m²), shared equally by the grid
    moment: f64,
    angle: f64,
    mu: f64,
    #[serde(skip)]
    dipoles: OnceCell<Vec<Dipole>>,
}

impl Default for ExtendedMagnet {
    fn default() -> Self {
        ExtendedMagnet::new(Point::origin(), 0.1, 90.0)
    }
}

impl PartialEq for ExtendedMagnet {
    fn eq(&self, other: &Self) -> bool {
        self.center == other.center
            && self.radius == other.radius
            && self.length == other.length
            && self.nx == other.nx
            && self.ny == other.ny
            && self.moment == other.moment
            && self.angle == other.angle
            && self.mu == other.mu
    }
}

impl ExtendedMagnet {
    pub fn new(center: Point, moment: f64, angle: f64) -> Self {
        ExtendedMagnet {
            center,
            radius: 0.01,
            length: 0.03,
            nx: 3,
            ny: 5,
            moment,
            angle,
            mu: MU_0,
            dipoles: OnceCell::new(),
        }
    }

    pub fn with_geometry(mut self, radius: f64, length: f64, nx: usize, ny: usize) -> Self {
        self.radius = radius;
        self.length = length;
        self.nx = nx;
        self.ny = ny;
        self.invalidate();
        self
    }

    // MARK: Accessors
    pub fn center(&self) -> Point {
        self.center
    }
    pub fn radius(&self) -> f64 {
        self.radius
    }
    pub fn length(&self) -> f64 {
        self.length
    }
    pub fn grid_counts(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
    pub fn moment(&self) -> f64 {
        self.moment
    }
    pub fn angle(&self) -> f64 {
        self.angle
    }
    pub fn mu(&self) -> f64 {
        self.mu
    }

    fn invalidate(&mut self) {
        self.dipoles = OnceCell::new();
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
        self.invalidate();
    }
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.invalidate();
    }
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.invalidate();
    }
    pub fn set_grid_counts(&mut self, nx: usize, ny: usize) {
        self.nx = nx;
        self.ny = ny;
        self.invalidate();
    }
    pub fn set_moment(&mut self, moment: f64) {
        self.moment = moment;
        self.invalidate();
    }
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        self.invalidate();
    }
    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
        self.invalidate();
    }

    /// Whether the dipole grid must be rebuilt before the next query.
    pub fn is_stale(&self) -> bool {
        self.dipoles.get().is_none()
    }

    // MARK: Dipole grid
    fn build_dipoles(&self) -> Vec<Dipole> {
        let nx = self.nx.max(1);
        let ny = self.ny.max(1);
        let Some(total) = nx.checked_mul(ny).filter(|&n| n <= MAX_GRID_DIPOLES) else {
            log::warn!("magnet grid {nx}x{ny} exceeds {MAX_GRID_DIPOLES} dipoles, skipping");
            return Vec::new();
        };
        let axis = direction(self.angle);
        let across = Vector2::new(-axis.y, axis.x);
        let share = self.moment / total as f64;

        let mut dipoles = Vec::with_capacity(total);
        for j in 0..ny {
            let along = self.length * ((j as f64 + 0.5) / ny as f64 - 0.5);
            for i in 0..nx {
                let side = 2.0 * self.radius * ((i as f64 + 0.5) / nx as f64 - 0.5);
                let position = self.center + axis * along + across * side;
                dipoles.push(Dipole::new(position, share, self.angle).with_mu(self.mu));
            }
        }
        dipoles
    }

    pub fn dipoles(&self) -> &[Dipole] {
        self.dipoles.get_or_init(|| self.build_dipoles())
    }

    pub fn field(&self, point: &Point) -> FieldSample {
        self.dipoles().iter().map(|d| d.field(point)).sum()
    }

    pub fn potential(&self, point: &Point) -> PotentialSample {
        self.dipoles().iter().map(|d| d.potential(point)).sum()
    }
}
