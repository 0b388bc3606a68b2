use crate::config::GridSpec;
use crate::error::Result;
use crate::simulation::{Simulation, SimulationStats};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Field grid as CSV for plotting with external tools
pub fn save_field_csv<P: AsRef<Path>>(simulation: &Simulation, grid: &GridSpec, path: P) -> Result<()> {
    let field = simulation.field_grid(grid)?;
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "x,y,bx,by,magnitude")?;
    for (i, row) in field.iter().enumerate() {
        let y = grid.y_at(i);
        for (j, b) in row.iter().enumerate() {
            writeln!(file, "{},{},{},{},{}", grid.x_at(j), y, b.bx, b.by, b.magnitude())?;
        }
    }
    file.flush()?;
    Ok(())
}

pub fn save_potential_csv<P: AsRef<Path>>(simulation: &Simulation, grid: &GridSpec, path: P) -> Result<()> {
    let potential = simulation.potential_grid(grid)?;
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "x,y,az")?;
    for (i, row) in potential.iter().enumerate() {
        let y = grid.y_at(i);
        for (j, a) in row.iter().enumerate() {
            writeln!(file, "{},{},{}", grid.x_at(j), y, a.az)?;
        }
    }
    file.flush()?;
    Ok(())
}

// Statistics time series
pub fn save_statistics_csv<P: AsRef<Path>>(stats: &SimulationStats, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "time,induced_current,rope_energy")?;
    for (t, current, energy) in stats.recent() {
        writeln!(file, "{},{},{}", t, current, energy)?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solenoid::Solenoid;
    use crate::sources::Source;
    use std::fs;

    #[test]
    fn field_csv_has_one_line_per_grid_point() {
        let mut sim = Simulation::new();
        sim.add_source(Source::Solenoid(Solenoid::default()));
        let grid = GridSpec::new(-0.1, 0.1, -0.1, 0.1, 4);
        let path = std::env::temp_dir().join(format!("field_csv_{}.csv", std::process::id()));

        save_field_csv(&sim, &grid, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "x,y,bx,by,magnitude");
        assert_eq!(lines.len(), 1 + 16);
        assert!(lines[1].starts_with("-0.1,-0.1,"));
    }

    #[test]
    fn statistics_csv_follows_recorded_steps() {
        let mut sim = Simulation::new();
        for _ in 0..3 {
            sim.step(0.01);
        }
        let path = std::env::temp_dir().join(format!("stats_csv_{}.csv", std::process::id()));
        save_statistics_csv(&sim.stats, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(text.lines().count(), 4);
    }
}
