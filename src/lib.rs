//! Quasi-static 2D magnetic field engine.
//!
//! Solenoids, permanent magnets, pick-up coils and flexible dipole ropes are
//! superposed in the plane. A [`Simulation`] owns the sources, answers point and
//! grid queries, and advances induction and rope mechanics frame by frame.

pub mod coil;
pub mod config;
pub mod dipole;
pub mod elliptic;
pub mod error;
pub mod field;
pub mod magnet;
pub mod rope;
pub mod simulation;
pub mod solenoid;
pub mod sources;
pub mod visualisation;

pub use coil::MeasurementCoil;
pub use config::{DriveMode, GridSpec, SceneConfig};
pub use dipole::Dipole;
pub use error::{FieldError, Result};
pub use field::{FieldSample, Point, PotentialSample, MU_0};
pub use magnet::ExtendedMagnet;
pub use rope::Rope;
pub use simulation::{Simulation, SimulationStats};
pub use solenoid::Solenoid;
pub use sources::{ExternalField, Source, SourceEntry, SourceId};
