//! Simulation driver
//!
//! Owns the termination decision and forwards each tick's snapshot and
//! statistics to the output collaborator.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::output::SnapshotSink;

use super::model::TrafficModel;
use super::types::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

/// Cooperative cancellation handle for a running engine.
///
/// `stop` sets a flag the engine observes at the top of the next
/// iteration and wakes an in-progress inter-tick delay; an in-flight
/// tick always completes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    signal: Arc<StopSignal>,
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopHandle {
    pub fn stop(&self) {
        *self.lock() = true;
        self.signal.condvar.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.lock()
    }

    /// Blocks until a stop is requested or `timeout` elapses, whichever
    /// comes first.
    fn wait_timeout(&self, timeout: Duration) {
        let stopped = self.lock();
        drop(
            self.signal
                .condvar
                .wait_timeout_while(stopped, timeout, |stopped| !*stopped)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.signal
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives a traffic model across discrete ticks.
pub struct SimulationEngine {
    model: Box<dyn TrafficModel>,
    state: EngineState,
    stop: StopHandle,
}

impl SimulationEngine {
    pub fn new(model: Box<dyn TrafficModel>) -> Self {
        Self {
            model,
            state: EngineState::Idle,
            stop: StopHandle::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn model(&self) -> &dyn TrafficModel {
        &*self.model
    }

    /// Handle for requesting a stop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs until the configured step count is reached (forever when the
    /// config leaves it unset) or a stop is requested. Each iteration
    /// steps the model, waits out the configured inter-tick delay (cut
    /// short the moment a stop arrives), and hands the snapshot and
    /// running statistics to the sink.
    ///
    /// A step error leaves the engine `Stopped` and propagates; the model
    /// must not be reused afterwards.
    pub fn run(&mut self, sink: &mut dyn SnapshotSink) -> Result<(), SimulationError> {
        self.state = EngineState::Running;
        let step_count = self.model.config().step_count;
        let step_delay = self.model.config().step_delay;

        let mut completed: u64 = 0;
        while !self.stop.is_stop_requested() && step_count.is_none_or(|limit| completed < limit) {
            if let Err(error) = self.model.step() {
                self.state = EngineState::Stopped;
                return Err(error);
            }
            completed += 1;

            if !step_delay.is_zero() {
                self.stop.wait_timeout(step_delay);
            }

            sink.on_snapshot(self.model.snapshot());
            sink.on_statistics(self.model.statistics());
        }

        debug!("engine stopped after {completed} steps");
        self.state = EngineState::Stopped;
        Ok(())
    }
}
