use crate::algorithms::path_loss::DistanceConfig;
use crate::algorithms::trilateration::SolverConfig;
use crate::core::{MAX_PATH_LOSS_EXPONENT, MIN_ANCHORS_2D, MIN_PATH_LOSS_EXPONENT};
use crate::processing::conditioner::{ConditionerConfig, WindowPolicy};
use crate::processing::kalman::{MeasurementNoise, TrackerConfig};
use crate::validation::quality::QualityConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning for every stage of the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    pub conditioner: ConditionerConfig,
    pub distance: DistanceConfig,
    pub solver: SolverConfig,
    pub tracker: TrackerConfig,
    pub quality: QualityConfig,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },

    #[error("configuration serialization failed: {message}")]
    Serialization { message: String },
}

/// Outcome of [`PositioningConfig::validate`]
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// First error, if any
    pub fn into_result(self) -> Result<(), ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl PositioningConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Serialization { message: e.to_string() })?;
        config.validate().into_result()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization { message: e.to_string() })
    }

    /// Check every stage's parameters
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Conditioner
        let c = &self.conditioner;
        match c.window {
            WindowPolicy::LastSamples(0) => errors.push(invalid("conditioner.window", "0 samples", "window must be non-empty")),
            WindowPolicy::LastMillis(0) => errors.push(invalid("conditioner.window", "0 ms", "window must be non-empty")),
            WindowPolicy::LastSamples(n) if n < c.min_samples => {
                warnings.push(format!("window of {n} samples can never reach min_samples = {}", c.min_samples))
            }
            _ => {}
        }
        if !(c.mad_threshold > 0.0) {
            errors.push(invalid("conditioner.mad_threshold", c.mad_threshold, "must be positive"));
        }
        if !(0.0..0.5).contains(&c.trim_fraction) {
            errors.push(invalid("conditioner.trim_fraction", c.trim_fraction, "must be in [0, 0.5)"));
        }
        if c.min_samples == 0 {
            errors.push(invalid("conditioner.min_samples", c.min_samples, "at least one sample is required"));
        } else if c.min_samples < 3 {
            warnings.push("fewer than 3 samples per anchor makes MAD rejection ineffective".to_string());
        }
        if !(c.rssi_floor_dbm < c.rssi_ceiling_dbm) {
            errors.push(invalid("conditioner.rssi_floor_dbm", c.rssi_floor_dbm, "must be below rssi_ceiling_dbm"));
        }
        if c.smoothing && !(c.smoother_process_noise > 0.0 && c.smoother_measurement_noise > 0.0) {
            errors.push(invalid(
                "conditioner.smoother_measurement_noise",
                c.smoother_measurement_noise,
                "smoother noise terms must be positive",
            ));
        }

        // Distance model
        let d = &self.distance;
        if !(d.min_distance_m > 0.0 && d.min_distance_m < d.max_distance_m) {
            errors.push(invalid("distance.min_distance_m", d.min_distance_m, "must satisfy 0 < min < max"));
        }
        if let Err(reason) = d.default_params.validate() {
            errors.push(invalid("distance.default_params", d.default_params, &reason));
        } else if !(MIN_PATH_LOSS_EXPONENT..=MAX_PATH_LOSS_EXPONENT).contains(&d.default_params.path_loss_exponent) {
            warnings.push(format!(
                "path-loss exponent {} is outside the fitted range [{MIN_PATH_LOSS_EXPONENT}, {MAX_PATH_LOSS_EXPONENT}]",
                d.default_params.path_loss_exponent
            ));
        }

        // Solver
        let s = &self.solver;
        if !(MIN_ANCHORS_2D..=6).contains(&s.max_anchors) {
            errors.push(invalid("solver.max_anchors", s.max_anchors, "must be between 3 and 6"));
        }
        if s.max_iterations == 0 {
            errors.push(invalid("solver.max_iterations", s.max_iterations, "must be at least 1"));
        }
        if !(s.step_tolerance > 0.0) {
            errors.push(invalid("solver.step_tolerance", s.step_tolerance, "must be positive"));
        }
        if !(s.initial_lambda > 0.0) {
            errors.push(invalid("solver.initial_lambda", s.initial_lambda, "must be positive"));
        }
        if !(s.prior_weight >= 0.0) {
            errors.push(invalid("solver.prior_weight", s.prior_weight, "must be non-negative"));
        } else if s.prior_weight > 1.0 {
            warnings.push("prior_weight above 1 lets the previous position dominate the ranges".to_string());
        }
        if !(s.collinear_ratio > 0.0 && s.collinear_ratio < 1.0) {
            errors.push(invalid("solver.collinear_ratio", s.collinear_ratio, "must be in (0, 1)"));
        }

        // Tracker
        let t = &self.tracker;
        if !(t.initial_covariance > 0.0) {
            errors.push(invalid("tracker.initial_covariance", t.initial_covariance, "must be positive"));
        }
        if !(t.process_noise_position >= 0.0 && t.process_noise_velocity >= 0.0) {
            errors.push(invalid("tracker.process_noise_position", t.process_noise_position, "process noise must be non-negative"));
        }
        if !(t.min_dt_s > 0.0) {
            errors.push(invalid("tracker.min_dt_s", t.min_dt_s, "must be positive"));
        }
        let variance = match t.measurement_noise {
            MeasurementNoise::Fixed { variance } => variance,
            MeasurementNoise::FromAccuracy { min_variance } => min_variance,
        };
        if !(variance > 0.0) {
            errors.push(invalid("tracker.measurement_noise", variance, "variance must be positive"));
        }
        if t.max_time_gap_ms < 1_000 {
            warnings.push("max_time_gap_ms below 1 s restarts tracks between ordinary cycles".to_string());
        }

        // Quality
        let q = &self.quality;
        if !(q.min_accuracy_m > 0.0 && q.min_accuracy_m <= q.max_accuracy_m) {
            errors.push(invalid("quality.min_accuracy_m", q.min_accuracy_m, "must satisfy 0 < min <= max"));
        }

        ValidationResult { is_valid: errors.is_empty(), errors, warnings }
    }
}
