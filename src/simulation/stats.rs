//! Aggregate flow statistics
//!
//! Pure accumulation over per-tick snapshots; no I/O.

use super::types::TrafficSnapshot;

/// Running sums of the per-tick flow measures plus an iteration counter.
///
/// The getters return the average over all recorded ticks and must not be
/// called before the first snapshot has been recorded.
#[derive(Debug, Clone, Default)]
pub struct SimulationStatistics {
    density_sum: f64,
    average_speed_sum: f64,
    flow_sum: f64,
    iteration_count: u64,
}

impl SimulationStatistics {
    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    /// Mean density over all recorded ticks (vehicles per cell).
    pub fn density(&self) -> f64 {
        self.density_sum / self.checked_count()
    }

    /// Mean of the per-tick average vehicle speeds.
    pub fn average_speed(&self) -> f64 {
        self.average_speed_sum / self.checked_count()
    }

    /// Mean detector passes per tick.
    pub fn flow(&self) -> f64 {
        self.flow_sum / self.checked_count()
    }

    fn checked_count(&self) -> f64 {
        assert!(
            self.iteration_count > 0,
            "statistics read before any snapshot was recorded"
        );
        self.iteration_count as f64
    }
}

/// Folds per-tick snapshots into running [`SimulationStatistics`].
#[derive(Debug, Clone, Default)]
pub struct StatisticsAccumulator {
    totals: SimulationStatistics,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the instantaneous density, average speed and flow of the
    /// snapshot and folds each into the running sums.
    pub fn add(&mut self, snapshot: &TrafficSnapshot) {
        self.totals.density_sum += instantaneous_density(snapshot);
        self.totals.average_speed_sum += instantaneous_average_speed(snapshot);
        self.totals.flow_sum += f64::from(snapshot.vehicles_passed);
        self.totals.iteration_count += 1;
    }

    pub fn totals(&self) -> &SimulationStatistics {
        &self.totals
    }
}

/// Vehicles per cell for a single tick.
fn instantaneous_density(snapshot: &TrafficSnapshot) -> f64 {
    snapshot.vehicles.len() as f64 / snapshot.road_length() as f64
}

/// Mean vehicle velocity for a single tick, 0 for an empty road.
fn instantaneous_average_speed(snapshot: &TrafficSnapshot) -> f64 {
    if snapshot.vehicles.is_empty() {
        return 0.0;
    }
    let total: u64 = snapshot
        .vehicles
        .iter()
        .map(|vehicle| u64::from(vehicle.velocity))
        .sum();
    total as f64 / snapshot.vehicles.len() as f64
}
