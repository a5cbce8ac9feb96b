//! Output collaborators consuming per-tick snapshots
//!
//! The simulation core calls exactly two sink operations per tick. Sinks
//! are fire-and-forget: a failing write is logged and never fed back into
//! the simulation.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::warn;

use crate::config::SimulationConfig;
use crate::simulation::{SimulationStatistics, TrafficSnapshot};

/// Per-tick output collaborator. Implementations must not assume the
/// snapshot outlives the call.
pub trait SnapshotSink {
    fn on_snapshot(&mut self, snapshot: &TrafficSnapshot);
    fn on_statistics(&mut self, statistics: &SimulationStatistics);
}

/// Sink that discards everything. Used by runs that only need the final
/// statistics carried on the model.
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn on_snapshot(&mut self, _snapshot: &TrafficSnapshot) {}
    fn on_statistics(&mut self, _statistics: &SimulationStatistics) {}
}

/// Writes delimited text files under a common prefix, one row per tick:
/// cell occupancy, per-cell velocities, the tick index, and the running
/// density / average speed / flow.
pub struct FileSink {
    position: BufWriter<File>,
    velocity: BufWriter<File>,
    time: BufWriter<File>,
    density: BufWriter<File>,
    speed: BufWriter<File>,
    flow: BufWriter<File>,
    max_speed: u32,
    cyclic: bool,
}

impl FileSink {
    /// Creates the six output files under `<output_prefix>_<name>`,
    /// creating parent directories as needed.
    pub fn create(config: &SimulationConfig) -> io::Result<Self> {
        let prefix = &config.output_prefix;
        if let Some(parent) = Path::new(prefix).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let open = |suffix: &str| -> io::Result<BufWriter<File>> {
            Ok(BufWriter::new(File::create(format!("{prefix}_{suffix}"))?))
        };
        Ok(Self {
            position: open("position")?,
            velocity: open("velocity")?,
            time: open("time")?,
            density: open("density")?,
            speed: open("speed")?,
            flow: open("flow")?,
            max_speed: config.max_speed,
            cyclic: config.cyclic,
        })
    }

    fn write_snapshot(&mut self, snapshot: &TrafficSnapshot) -> io::Result<()> {
        let occupancy: Vec<String> = snapshot
            .cells
            .iter()
            .map(|cell| if cell.is_some() { "1" } else { "0" }.to_string())
            .collect();
        writeln!(self.position, "{}", occupancy.join(" "))?;

        let velocities = velocity_row(snapshot, self.max_speed, self.cyclic);
        let velocities: Vec<String> = velocities.iter().map(i64::to_string).collect();
        writeln!(self.velocity, "{}", velocities.join(" "))?;

        writeln!(self.time, "{}", snapshot.step)?;

        self.position.flush()?;
        self.velocity.flush()?;
        self.time.flush()
    }

    fn write_statistics(&mut self, statistics: &SimulationStatistics) -> io::Result<()> {
        writeln!(self.density, "{}", statistics.density())?;
        writeln!(self.speed, "{}", statistics.average_speed())?;
        writeln!(self.flow, "{}", statistics.flow())?;
        self.density.flush()?;
        self.speed.flush()?;
        self.flow.flush()
    }
}

impl SnapshotSink for FileSink {
    fn on_snapshot(&mut self, snapshot: &TrafficSnapshot) {
        if let Err(error) = self.write_snapshot(snapshot) {
            warn!("failed to write snapshot row: {error}");
        }
    }

    fn on_statistics(&mut self, statistics: &SimulationStatistics) {
        if let Err(error) = self.write_statistics(statistics) {
            warn!("failed to write statistics row: {error}");
        }
    }
}

/// Per-cell velocity row. Occupied cells carry their vehicle's velocity;
/// empty cells are filled with the velocity of the next vehicle
/// downstream (wrapping on a cyclic lane, `max_speed` past an open road
/// end) so plots shade free space by the speed of the approaching
/// traffic. Cells with no vehicle anywhere downstream stay at -1.
fn velocity_row(snapshot: &TrafficSnapshot, max_speed: u32, cyclic: bool) -> Vec<i64> {
    const NO_VEHICLE: i64 = -1;
    let length = snapshot.road_length();
    let mut row = vec![NO_VEHICLE; length];
    for vehicle in &snapshot.vehicles {
        row[vehicle.position] = i64::from(vehicle.velocity);
    }

    let filled: Vec<i64> = (0..length)
        .map(|cell| {
            if row[cell] != NO_VEHICLE {
                return row[cell];
            }
            for offset in 1..length {
                let index = cell + offset;
                if index >= length {
                    if cyclic {
                        let wrapped = index % length;
                        if row[wrapped] != NO_VEHICLE {
                            return row[wrapped];
                        }
                    } else {
                        return i64::from(max_speed);
                    }
                } else if row[index] != NO_VEHICLE {
                    return row[index];
                }
            }
            NO_VEHICLE
        })
        .collect();
    filled
}
