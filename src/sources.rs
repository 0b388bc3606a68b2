use crate::coil::MeasurementCoil;
use crate::error::{FieldError, Result};
use crate::field::{FieldSample, Point, PotentialSample};
use crate::magnet::{ExtendedMagnet, MAX_GRID_DIPOLES};
use crate::rope::{MAX_NODES, Rope};
use crate::solenoid::{MAX_POTENTIAL_LOOPS, Solenoid};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier handed out by a [`crate::Simulation`], unique for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub(crate) u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of field sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Source {
    /// Finite current-carrying solenoid
    Solenoid(Solenoid),

    /// Permanent magnet as a dipole grid
    Magnet(ExtendedMagnet),

    /// Passive pick-up coil
    MeasurementCoil(MeasurementCoil),

    /// Flexible chain of aligning dipoles
    Rope(Rope),
}

impl Source {
    /// Calculate the field contributed at a point
    pub fn field(&self, point: &Point) -> FieldSample {
        match self {
            Source::Solenoid(s) => s.field(point),
            Source::Magnet(m) => m.field(point),
            Source::MeasurementCoil(c) => c.field(point),
            Source::Rope(r) => r.field(point),
        }
    }

    pub fn potential(&self, point: &Point) -> PotentialSample {
        match self {
            Source::Solenoid(s) => s.potential(point),
            Source::Magnet(m) => m.potential(point),
            Source::MeasurementCoil(c) => c.potential(point),
            Source::Rope(r) => r.potential(point),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Solenoid(_) => "solenoid",
            Source::Magnet(_) => "magnet",
            Source::MeasurementCoil(_) => "measurementCoil",
            Source::Rope(_) => "rope",
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Source::Solenoid(s) => s.center,
            Source::Magnet(m) => m.center(),
            Source::MeasurementCoil(c) => c.center,
            Source::Rope(r) => r.center(),
        }
    }

    // MARK: Patching
    /// Apply named numeric fields atomically.
    ///
    /// Keys match case-insensitively with underscores ignored, so `nTurns`
    /// and `n_turns` are the same field. Unknown keys are skipped and
    /// returned. Any invalid value rejects the whole patch and leaves the
    /// source untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<Vec<String>> {
        let mut candidate = self.clone();
        let mut ignored = Vec::new();

        for (key, value) in patch {
            let normalized = normalize_key(key);
            let Some(number) = value.as_f64() else {
                if candidate.accepts(&normalized) {
                    return Err(FieldError::invalid(key, format!("expected a number, got {value}")));
                }
                ignored.push(key.clone());
                continue;
            };
            if !number.is_finite() {
                return Err(FieldError::invalid(key, "value must be finite"));
            }
            if !candidate.set_property(key, &normalized, number)? {
                ignored.push(key.clone());
            }
        }

        if !ignored.is_empty() {
            log::debug!("{} patch ignored unknown keys {:?}", self.kind(), ignored);
        }
        *self = candidate;
        Ok(ignored)
    }

    fn accepts(&self, normalized: &str) -> bool {
        let keys: &[&str] = match self {
            Source::Solenoid(_) => &[
                "x", "y", "radius", "length", "nturns", "turns", "current", "basecurrent", "mu",
            ],
            Source::Magnet(_) => &[
                "x", "y", "radius", "length", "nx", "ny", "moment", "angle", "mu",
            ],
            Source::MeasurementCoil(_) => {
                &["x", "y", "radius", "length", "nturns", "turns", "resistance"]
            }
            Source::Rope(_) => &[
                "x",
                "y",
                "length",
                "density",
                "dipolemoment",
                "moment",
                "mu",
                "tension",
                "lineardensity",
                "massdensity",
                "damping",
            ],
        };
        keys.contains(&normalized)
    }

    /// Returns `Ok(false)` for keys this source does not have.
    fn set_property(&mut self, key: &str, normalized: &str, value: f64) -> Result<bool> {
        match self {
            Source::Solenoid(s) => match normalized {
                "x" => s.center.x = value,
                "y" => s.center.y = value,
                "radius" => s.radius = positive(key, value)?,
                "length" => s.length = positive(key, value)?,
                "nturns" | "turns" => {
                    s.turns = at_most(key, non_negative(key, value)?, MAX_POTENTIAL_LOOPS)?
                }
                "current" => {
                    s.current = value;
                    s.base_current = value;
                }
                "basecurrent" => s.base_current = value,
                "mu" => s.mu = positive(key, value)?,
                _ => return Ok(false),
            },
            Source::Magnet(m) => match normalized {
                "x" => m.set_center(Point::new(value, m.center().y)),
                "y" => m.set_center(Point::new(m.center().x, value)),
                "radius" => m.set_radius(non_negative(key, value)?),
                "length" => m.set_length(non_negative(key, value)?),
                "nx" => {
                    let (_, ny) = m.grid_counts();
                    let nx = count(key, value)?;
                    grid_size(key, nx, ny)?;
                    m.set_grid_counts(nx, ny);
                }
                "ny" => {
                    let (nx, _) = m.grid_counts();
                    let ny = count(key, value)?;
                    grid_size(key, nx, ny)?;
                    m.set_grid_counts(nx, ny);
                }
                "moment" => m.set_moment(value),
                "angle" => m.set_angle(value),
                "mu" => m.set_mu(positive(key, value)?),
                _ => return Ok(false),
            },
            Source::MeasurementCoil(c) => match normalized {
                "x" => c.center.x = value,
                "y" => c.center.y = value,
                "radius" => c.radius = positive(key, value)?,
                "length" => c.length = positive(key, value)?,
                "nturns" | "turns" => c.turns = non_negative(key, value)?,
                "resistance" => c.resistance = positive(key, value)?,
                _ => return Ok(false),
            },
            Source::Rope(r) => match normalized {
                "x" => r.set_center(Point::new(value, r.center().y)),
                "y" => r.set_center(Point::new(r.center().x, value)),
                "length" => {
                    let length = positive(key, value)?;
                    at_most(key, (length * r.density()).round(), MAX_NODES)?;
                    r.set_length(length);
                }
                "density" => {
                    let density = non_negative(key, value)?;
                    at_most(key, (r.length() * density).round(), MAX_NODES)?;
                    r.set_density(density);
                }
                "dipolemoment" | "moment" => r.set_dipole_moment(value),
                "mu" => r.set_mu(positive(key, value)?),
                "tension" => r.set_tension(positive(key, value)?),
                "lineardensity" | "massdensity" => r.set_linear_density(positive(key, value)?),
                "damping" => r.set_damping(non_negative(key, value)?),
                _ => return Ok(false),
            },
        }
        Ok(true)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn positive(key: &str, value: f64) -> Result<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(FieldError::invalid(key, format!("must be positive, got {value}")))
    }
}

fn non_negative(key: &str, value: f64) -> Result<f64> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(FieldError::invalid(key, format!("must not be negative, got {value}")))
    }
}

fn at_most(key: &str, value: f64, limit: usize) -> Result<f64> {
    if value <= limit as f64 {
        Ok(value)
    } else {
        Err(FieldError::invalid(key, format!("{value} exceeds the limit of {limit}")))
    }
}

fn grid_size(key: &str, nx: usize, ny: usize) -> Result<()> {
    match nx.checked_mul(ny) {
        Some(total) if total <= MAX_GRID_DIPOLES => Ok(()),
        _ => Err(FieldError::invalid(
            key,
            format!("{nx}x{ny} grid exceeds {MAX_GRID_DIPOLES} dipoles"),
        )),
    }
}

fn count(key: &str, value: f64) -> Result<usize> {
    let rounded = value.round();
    if rounded >= 1.0 {
        Ok(rounded as usize)
    } else {
        Err(FieldError::invalid(key, format!("must be at least 1, got {value}")))
    }
}

// MARK: Registered sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: SourceId,
    pub source: Source,
}

impl SourceEntry {
    pub(crate) fn new(id: SourceId, source: Source) -> Self {
        SourceEntry { id, source }
    }
}

// MARK: External Field
/// Field of every registered source except the one being updated.
#[derive(Debug, Clone, Copy)]
pub struct ExternalField<'a> {
    before: &'a [SourceEntry],
    after: &'a [SourceEntry],
}

impl<'a> ExternalField<'a> {
    /// Every entry in `sources` contributes.
    pub fn new(sources: &'a [SourceEntry]) -> Self {
        ExternalField {
            before: sources,
            after: &[],
        }
    }

    /// No sources at all.
    pub fn none() -> Self {
        ExternalField {
            before: &[],
            after: &[],
        }
    }

    /// The sources on either side of a split-off entry.
    pub(crate) fn around(before: &'a [SourceEntry], after: &'a [SourceEntry]) -> Self {
        ExternalField { before, after }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    pub fn field_at(&self, point: &Point) -> FieldSample {
        self.before
            .iter()
            .chain(self.after)
            .map(|entry| entry.source.field(point))
            .sum()
    }
}
