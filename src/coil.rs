use crate::field::{FieldSample, Point, PotentialSample};
use crate::sources::ExternalField;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Passive pick-up coil with its axis along y.
///
/// It contributes no field of its own. Each update samples the flux linked by
/// its turns and derives the induced current from Faraday's law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementCoil {
    pub center: Point,
    pub radius: f64,
    pub length: f64,
    pub turns: f64,
    /// Ohms
    pub resistance: f64,
    pub induced_current: f64,
    /// Flux from the previous update, `None` before the first sample
    pub previous_flux: Option<f64>,
    last_emf: f64,
}

impl Default for MeasurementCoil {
    fn default() -> Self {
        MeasurementCoil::new(Point::origin(), 0.03, 0.05, 50.0, 10.0)
    }
}

impl MeasurementCoil {
    pub fn new(center: Point, radius: f64, length: f64, turns: f64, resistance: f64) -> Self {
        MeasurementCoil {
            center,
            radius,
            length,
            turns,
            resistance,
            induced_current: 0.0,
            previous_flux: None,
            last_emf: 0.0,
        }
    }

    pub fn field(&self, _point: &Point) -> FieldSample {
        FieldSample::ZERO
    }

    pub fn potential(&self, _point: &Point) -> PotentialSample {
        PotentialSample::ZERO
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    // MARK: Flux
    /// Flux linkage N·A·By from every other source, sampled at the center.
    pub fn compute_flux(&self, external: &ExternalField) -> f64 {
        external.field_at(&self.center).by * self.area() * self.turns
    }

    // MARK: Induction
    /// Discrete Faraday's law: e = −ΔΦ/Δt, I = e/R.
    ///
    /// The first call only records the flux. A non-positive `dt` records the
    /// flux without touching the current.
    pub fn update_induced_current(&mut self, external: &ExternalField, dt: f64) {
        let flux = self.compute_flux(external);
        self.record_flux(flux, dt);
    }

    pub(crate) fn record_flux(&mut self, flux: f64, dt: f64) {
        if let Some(previous) = self.previous_flux {
            if dt > 0.0 {
                self.last_emf = -(flux - previous) / dt;
                self.induced_current = self.last_emf / self.resistance;
            }
        }
        self.previous_flux = Some(flux);
    }

    /// EMF from the most recent update with a usable time step.
    pub fn induced_emf(&self) -> f64 {
        self.last_emf
    }

    /// Forget the flux history so the next update starts a new measurement.
    pub fn reset_induction(&mut self) {
        self.induced_current = 0.0;
        self.previous_flux = None;
        self.last_emf = 0.0;
    }
}
