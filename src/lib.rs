//! Indoor BLE Positioning Core
//!
//! Turns noisy RSSI samples from fixed beacons into smoothed 2D position
//! estimates: robust RSSI conditioning, log-distance ranging, damped
//! least-squares multilateration and constant-velocity tracking.

pub mod algorithms;
pub mod api;
pub mod core;
pub mod processing;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use algorithms::path_loss::{calibrate, CalibrationPair, CalibrationParams, CalibrationSet, KnownPoint};
pub use api::PositioningEngine;
pub use core::{
    load_registry, AnchorId, AnchorPosition, PositionEstimate, QualityLabel, Registry, RssiSample, SolveMethod,
    StabilityLabel, Timestamp,
};
pub use processing::kalman::{reset_tracker, DeviceState, TrackerRegistry};
pub use processing::parser::parse_beacon_map;
pub use utils::config::PositioningConfig;
pub use validation::error::{PositioningError, PositioningResult};
