//! Public entry point for running update cycles

pub mod engine;

pub use engine::{CycleReadings, PositioningEngine};
