// External crates
use crate::config::{DriveMode, GridSpec, SceneConfig};
use crate::error::{FieldError, Result};
use crate::field::{FieldSample, Point, PotentialSample};
use crate::sources::{ExternalField, Source, SourceEntry, SourceId};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Default number of recent samples kept per statistics series.
pub const DEFAULT_HISTORY_LIMIT: usize = 100_000;

// MARK: Data Structures
/// Per-step time series. Only the most recent `history_limit` samples are
/// kept; `step_count` counts every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationStats {
    pub time_points: Vec<f64>,
    /// Sum of induced currents over every measurement coil (A)
    pub induced_current: Vec<f64>,
    /// Sum of rope mechanical energies (J)
    pub rope_energy: Vec<f64>,
    pub step_count: usize,
    pub history_limit: usize,
}

impl Default for SimulationStats {
    fn default() -> Self {
        SimulationStats::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl SimulationStats {
    pub fn with_history_limit(history_limit: usize) -> Self {
        SimulationStats {
            time_points: Vec::new(),
            induced_current: Vec::new(),
            rope_energy: Vec::new(),
            step_count: 0,
            history_limit,
        }
    }

    fn record(&mut self, time: f64, current: f64, energy: f64) {
        self.time_points.push(time);
        self.induced_current.push(current);
        self.rope_energy.push(energy);
        self.step_count += 1;

        // Trim in chunks so each step stays amortized O(1)
        let limit = self.history_limit.max(1);
        if self.time_points.len() >= 2 * limit {
            let excess = self.time_points.len() - limit;
            self.time_points.drain(..excess);
            self.induced_current.drain(..excess);
            self.rope_energy.drain(..excess);
        }
    }

    /// Most recent samples, oldest first, at most `history_limit` long.
    pub fn recent(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let skip = self.time_points.len().saturating_sub(self.history_limit.max(1));
        self.time_points
            .iter()
            .zip(&self.induced_current)
            .zip(&self.rope_energy)
            .skip(skip)
            .map(|((&t, &i), &e)| (t, i, e))
    }

    /// Drop the recorded series, keeping the limit.
    pub fn clear(&mut self) {
        *self = SimulationStats::with_history_limit(self.history_limit);
    }
}

/// Owns every source and drives the per-frame update order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    entries: Vec<SourceEntry>,
    next_id: u64,
    pub time: f64,
    pub drive: DriveMode,
    pub stats: SimulationStats,
}

impl Default for Simulation {
    fn default() -> Self {
        Simulation::new()
    }
}

// MARK: Implementation
impl Simulation {
    pub fn new() -> Self {
        Simulation {
            entries: Vec::new(),
            next_id: 1,
            time: 0.0,
            drive: DriveMode::Static,
            stats: SimulationStats::default(),
        }
    }

    pub fn from_scene(scene: &SceneConfig) -> Self {
        let mut sim = Simulation::new();
        sim.drive = scene.drive;
        for source in &scene.sources {
            sim.add_source(source.clone());
        }
        sim
    }

    // MARK: Registry
    pub fn add_source(&mut self, mut source: Source) -> SourceId {
        if let Source::Rope(rope) = &mut source {
            rope.sync_nodes();
        }
        let id = SourceId(self.next_id);
        self.next_id += 1;
        debug!("added {} {}", source.kind(), id);
        self.entries.push(SourceEntry::new(id, source));
        id
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<Source> {
        let index = self.index_of(id)?;
        Ok(self.entries.remove(index).source)
    }

    /// Patch named numeric fields on a source. Returns the keys it ignored.
    pub fn update_source(&mut self, id: SourceId, patch: &Map<String, Value>) -> Result<Vec<String>> {
        let index = self.index_of(id)?;
        let source = &mut self.entries[index].source;
        let result = source.apply_patch(patch);
        if let Err(e) = &result {
            warn!("rejected patch for {} {}: {}", source.kind(), id, e);
        }
        result
    }

    pub fn source(&self, id: SourceId) -> Option<&Source> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.source)
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.entries.iter_mut().find(|e| e.id == id).map(|e| &mut e.source)
    }

    /// Sources in insertion order.
    pub fn sources(&self) -> &[SourceEntry] {
        &self.entries
    }

    fn index_of(&self, id: SourceId) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(FieldError::UnknownSource(id))
    }

    // MARK: Queries
    pub fn field_at(&self, point: &Point) -> FieldSample {
        ExternalField::new(&self.entries).field_at(point)
    }

    pub fn potential_at(&self, point: &Point) -> PotentialSample {
        self.entries.iter().map(|e| e.source.potential(point)).sum()
    }

    /// Field on a regular grid, `result[i][j]` at (x_j, y_i).
    pub fn field_grid(&self, grid: &GridSpec) -> Result<Vec<Vec<FieldSample>>> {
        self.sample_grid(grid, |p| self.field_at(p))
    }

    pub fn potential_grid(&self, grid: &GridSpec) -> Result<Vec<Vec<PotentialSample>>> {
        self.sample_grid(grid, |p| self.potential_at(p))
    }

    fn sample_grid<T, F>(&self, grid: &GridSpec, sample: F) -> Result<Vec<Vec<T>>>
    where
        T: Send,
        F: Fn(&Point) -> T + Sync,
    {
        grid.validate()?;
        let rows: Vec<Vec<T>> = (0..grid.resolution)
            .into_par_iter()
            .map(|i| {
                let y = grid.y_at(i);
                (0..grid.resolution)
                    .map(|j| sample(&Point::new(grid.x_at(j), y)))
                    .collect::<Vec<T>>()
            })
            .collect();
        Ok(rows)
    }

    // MARK: Dynamics
    /// Visit every source mutably alongside the field of all the others.
    fn for_each_with_external<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut Source, &ExternalField),
    {
        for index in 0..self.entries.len() {
            let (before, rest) = self.entries.split_at_mut(index);
            if let Some((entry, after)) = rest.split_first_mut() {
                let external = ExternalField::around(before, after);
                visit(&mut entry.source, &external);
            }
        }
    }

    pub fn align_ropes(&mut self) {
        self.for_each_with_external(|source, external| {
            if let Source::Rope(rope) = source {
                rope.update_alignment(external);
            }
        });
    }

    pub fn update_measurement_coils(&mut self, dt: f64) {
        self.for_each_with_external(|source, external| {
            if let Source::MeasurementCoil(coil) = source {
                coil.update_induced_current(external, dt);
            }
        });
    }

    pub fn step_rope_mechanics(&mut self, dt: f64) {
        self.for_each_with_external(|source, external| {
            if let Source::Rope(rope) = source {
                rope.step_mechanics(external, dt);
            }
        });
    }

    fn apply_drive(&mut self) {
        let Some(factor) = self.drive.factor(self.time) else {
            return;
        };
        for entry in &mut self.entries {
            if let Source::Solenoid(solenoid) = &mut entry.source {
                solenoid.current = solenoid.base_current * factor;
            }
        }
    }

    /// Advance one frame: drive, alignment, induction, then mechanics.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        self.apply_drive();
        self.align_ropes();
        self.update_measurement_coils(dt);
        self.step_rope_mechanics(dt);
        self.update_statistics();
    }

    fn update_statistics(&mut self) {
        let mut current = 0.0;
        let mut energy = 0.0;
        for entry in &self.entries {
            match &entry.source {
                Source::MeasurementCoil(coil) => current += coil.induced_current,
                Source::Rope(rope) => energy += rope.mechanical_energy(),
                _ => {}
            }
        }
        self.stats.record(self.time, current, energy);

        if self.stats.step_count % 100 == 0 {
            debug!(
                "t={:.4}s coil current={:.4e} A rope energy={:.4e} J",
                self.time, current, energy
            );
        }
    }

    /// Back to t = 0 with every dynamic quantity at rest.
    pub fn reset_dynamics(&mut self) {
        self.time = 0.0;
        self.stats.clear();
        for entry in &mut self.entries {
            match &mut entry.source {
                Source::Solenoid(solenoid) => solenoid.current = solenoid.base_current,
                Source::MeasurementCoil(coil) => coil.reset_induction(),
                Source::Rope(rope) => rope.reset_mechanics(),
                Source::Magnet(_) => {}
            }
        }
    }

    pub fn run(&mut self, steps: usize, dt: f64, checkpoint_interval: Option<usize>) {
        info!("Running simulation for {} steps of {} s...", steps, dt);

        let progress_bar = ProgressBar::new(steps as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for step in 0..steps {
            progress_bar.set_position(step as u64);
            self.step(dt);

            if step % 10 == 0 {
                progress_bar.set_message(format!(
                    "Coil current: {:.4e} A",
                    self.stats.induced_current.last().unwrap_or(&0.0)
                ));
            }

            if let Some(interval) = checkpoint_interval {
                if interval > 0 && step % interval == 0 && step > 0 {
                    let checkpoint_filename = format!("checkpoint_{}.json", step);
                    if let Err(e) = self.save_checkpoint(&checkpoint_filename) {
                        warn!("Error saving checkpoint: {}", e);
                    }
                }
            }
        }

        progress_bar.finish_with_message("Simulation complete!");
    }

    // MARK: Checkpoints
    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        info!("Saving checkpoint to {}...", path.as_ref().display());
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading checkpoint from {}...", path.as_ref().display());
        let file = File::open(path)?;
        let mut sim: Simulation = serde_json::from_reader(BufReader::new(file))?;
        for entry in &mut sim.entries {
            if let Source::Rope(rope) = &mut entry.source {
                rope.sync_nodes();
            }
        }
        let highest = sim.entries.iter().map(|e| e.id.0).max().unwrap_or(0);
        sim.next_id = sim.next_id.max(highest + 1);
        Ok(sim)
    }
}
