//! Distance modeling and multilateration

pub mod path_loss;
pub mod trilateration;

pub use path_loss::{
    adaptive_params, calibrate, calibrate_per_anchor, calibrate_reference_power, CalibrationPair,
    CalibrationParams, CalibrationSet, DistanceConfig, DistanceModel, KnownPoint, ParamSource,
};
pub use trilateration::{GeometrySolver, SolveOutcome, SolverConfig, SolverInput};
