//! 1D Cellular-Automaton Traffic Simulation
//!
//! Models single-lane vehicular traffic with discrete-time, discrete-space
//! update rules (Nagel-Schreckenberg, Rule 184 and two slow-to-start
//! extensions) and derives aggregate flow statistics from per-tick
//! snapshots. The simulation core never performs I/O; each tick hands a
//! snapshot and the running statistics to a [`output::SnapshotSink`]
//! collaborator.

pub mod config;
pub mod output;
pub mod simulation;
