//! Signal conditioning, temporal tracking and input parsing

pub mod conditioner;
pub mod kalman;
pub mod parser;

pub use conditioner::{CentralEstimate, ConditionerConfig, RssiConditioner, RssiSmoother, WindowPolicy};
pub use kalman::{reset_tracker, DeviceState, MeasurementNoise, Tracker, TrackerConfig, TrackerRegistry};
pub use parser::{parse_beacon_map, parse_beacon_map_lenient};
