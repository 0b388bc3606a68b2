//! Scene description loaded by the command-line harness.

use crate::error::{FieldError, Result};
use crate::rope::MAX_FRAME_STEP;
use crate::sources::Source;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// How solenoid currents evolve with simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum DriveMode {
    /// Currents stay wherever they were set.
    #[default]
    Static,
    /// current = base_current · sin(2π·f·t + phase)
    Alternating { frequency: f64, phase: f64 },
}

impl DriveMode {
    /// Scale applied to a solenoid's base current at time `t`, `None` when static.
    pub fn factor(&self, t: f64) -> Option<f64> {
        match self {
            DriveMode::Static => None,
            DriveMode::Alternating { frequency, phase } => {
                Some((2.0 * PI * frequency * t + phase).sin())
            }
        }
    }
}

// MARK: Grid
/// Rectangular sampling window with `resolution` points per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub resolution: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        GridSpec {
            x_min: -0.2,
            x_max: 0.2,
            y_min: -0.2,
            y_max: 0.2,
            resolution: 41,
        }
    }
}

impl GridSpec {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, resolution: usize) -> Self {
        GridSpec {
            x_min,
            x_max,
            y_min,
            y_max,
            resolution,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            return Err(FieldError::InvalidGrid(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        let bounds = [self.x_min, self.x_max, self.y_min, self.y_max];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(FieldError::InvalidGrid(format!("non-finite bounds {bounds:?}")));
        }
        Ok(())
    }

    pub fn x_at(&self, j: usize) -> f64 {
        self.x_min + j as f64 * (self.x_max - self.x_min) / (self.resolution - 1) as f64
    }

    pub fn y_at(&self, i: usize) -> f64 {
        self.y_min + i as f64 * (self.y_max - self.y_min) / (self.resolution - 1) as f64
    }
}

// MARK: Scene
fn default_dt() -> f64 {
    1.0 / 60.0
}

fn default_steps() -> usize {
    600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub sources: Vec<Source>,
    pub drive: DriveMode,
    pub grid: GridSpec,
    /// Frame time step (s)
    pub dt: f64,
    pub steps: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            sources: Vec::new(),
            drive: DriveMode::Static,
            grid: GridSpec::default(),
            dt: default_dt(),
            steps: default_steps(),
        }
    }
}

impl SceneConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let scene: SceneConfig = serde_json::from_reader(BufReader::new(file))?;
        if scene.dt > MAX_FRAME_STEP {
            log::warn!(
                "scene dt {} exceeds the rope frame limit {}, ropes will be clamped",
                scene.dt,
                MAX_FRAME_STEP
            );
        }
        Ok(scene)
    }
}
