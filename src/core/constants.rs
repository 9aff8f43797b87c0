//! Physical defaults and algorithm constants for BLE positioning

/// Reference power at 1 m used when no calibration exists (dBm).
///
/// Seen across most deployments without a measured basis; treat it as a
/// starting point, not as physics.
pub const DEFAULT_REFERENCE_POWER_DBM: f64 = -59.0;

/// Path-loss exponent paired with [`DEFAULT_REFERENCE_POWER_DBM`].
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.0;

/// Lower distance clamp for RSSI conversion (meters)
pub const DEFAULT_MIN_DISTANCE_M: f64 = 0.1;

/// Upper distance clamp for RSSI conversion (meters)
pub const DEFAULT_MAX_DISTANCE_M: f64 = 50.0;

/// Scale turning a MAD into a standard-deviation estimate for normal data
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Huber tuning constant applied to the residual MAD during calibration
pub const HUBER_TUNING: f64 = 1.345;

/// Bounds for a fitted path-loss exponent
pub const MIN_PATH_LOSS_EXPONENT: f64 = 0.5;
pub const MAX_PATH_LOSS_EXPONENT: f64 = 6.0;

/// Minimum number of distinct anchors for a 2D fix
pub const MIN_ANCHORS_2D: usize = 3;

/// Minimum number of (distance, rssi) pairs for a calibration fit
pub const MIN_CALIBRATION_PAIRS: usize = 2;
