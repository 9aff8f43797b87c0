//! Log-distance path-loss model: RSSI to distance conversion and
//! calibration from known (distance, RSSI) pairs
//!
//! Model: `RSSI(d) = P0 - 10 * n * log10(d)`, with `P0` the reference power
//! at 1 m and `n` the path-loss exponent.

use crate::core::{
    AnchorId, Registry, DEFAULT_MAX_DISTANCE_M, DEFAULT_MIN_DISTANCE_M, DEFAULT_PATH_LOSS_EXPONENT,
    DEFAULT_REFERENCE_POWER_DBM, HUBER_TUNING, MAX_PATH_LOSS_EXPONENT, MIN_CALIBRATION_PAIRS,
    MIN_PATH_LOSS_EXPONENT,
};
use crate::utils::config::ConfigError;
use crate::utils::stats::{mad, mean, median, std_dev};
use crate::validation::error::{PositioningError, PositioningResult};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Path-loss parameters, global or for a single anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// RSSI at 1 m (dBm)
    pub reference_power: f64,
    pub path_loss_exponent: f64,
}

impl CalibrationParams {
    pub fn new(reference_power: f64, path_loss_exponent: f64) -> Self {
        Self { reference_power, path_loss_exponent }
    }

    /// Unclamped distance for an RSSI value: `10^((P0 - rssi) / (10 n))`
    pub fn rssi_to_distance(&self, rssi: f64) -> f64 {
        10f64.powf((self.reference_power - rssi) / (10.0 * self.path_loss_exponent))
    }

    /// Inverse of [`rssi_to_distance`](Self::rssi_to_distance)
    pub fn distance_to_rssi(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return f64::INFINITY;
        }
        self.reference_power - 10.0 * self.path_loss_exponent * distance.log10()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.reference_power.is_finite() || !self.path_loss_exponent.is_finite() {
            return Err("parameters must be finite".to_string());
        }
        if self.path_loss_exponent <= 0.0 {
            return Err("path-loss exponent must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_POWER_DBM, DEFAULT_PATH_LOSS_EXPONENT)
    }
}

impl fmt::Display for CalibrationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P0={:.2} dBm, n={:.2}", self.reference_power, self.path_loss_exponent)
    }
}

/// Calibration known to the caller: an optional global fit plus
/// per-anchor overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSet {
    pub global: Option<CalibrationParams>,
    pub per_anchor: BTreeMap<AnchorId, CalibrationParams>,
}

impl CalibrationSet {
    /// No calibration: the distance model picks adaptive defaults
    pub fn uncalibrated() -> Self {
        Self::default()
    }

    pub fn global(params: CalibrationParams) -> Self {
        Self { global: Some(params), per_anchor: BTreeMap::new() }
    }

    pub fn with_anchor(mut self, anchor_id: impl Into<AnchorId>, params: CalibrationParams) -> Self {
        self.per_anchor.insert(anchor_id.into(), params);
        self
    }

    /// Anchor override first, then the global value
    pub fn params_for(&self, anchor_id: &AnchorId) -> Option<(CalibrationParams, ParamSource)> {
        if let Some(params) = self.per_anchor.get(anchor_id) {
            return Some((*params, ParamSource::Anchor));
        }
        self.global.map(|params| (params, ParamSource::Global))
    }

    pub fn is_calibrated(&self) -> bool {
        self.global.is_some() || !self.per_anchor.is_empty()
    }
}

/// Where the parameters used for a reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    Anchor,
    Global,
    Adaptive,
    Configured,
}

/// Distance conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    /// Used when nothing is calibrated and adaptive defaults are off
    pub default_params: CalibrationParams,
    /// Pick uncalibrated parameters from the cycle's signal strength
    pub adaptive_defaults: bool,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            default_params: CalibrationParams::default(),
            adaptive_defaults: true,
        }
    }
}

/// Converts conditioned RSSI into bounded distances and solver weights
#[derive(Debug, Clone, Default)]
pub struct DistanceModel {
    pub config: DistanceConfig,
}

impl DistanceModel {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    /// Parameters for an anchor: calibration if present, otherwise the
    /// adaptive heuristic over `cycle_rssi` (or the configured default).
    pub fn resolve(
        &self,
        calibration: &CalibrationSet,
        anchor_id: &AnchorId,
        cycle_rssi: &[f64],
    ) -> (CalibrationParams, ParamSource) {
        if let Some(found) = calibration.params_for(anchor_id) {
            return found;
        }
        if self.config.adaptive_defaults {
            if let Some(params) = adaptive_params(cycle_rssi) {
                return (params, ParamSource::Adaptive);
            }
        }
        (self.config.default_params, ParamSource::Configured)
    }

    /// Distance clamped to the configured bounds
    pub fn distance(&self, params: &CalibrationParams, rssi: f64) -> f64 {
        let raw = params.rssi_to_distance(rssi);
        if raw.is_nan() {
            return self.config.max_distance_m;
        }
        raw.clamp(self.config.min_distance_m, self.config.max_distance_m)
    }

    /// Inverse-square weight: closer anchors are trusted more
    pub fn weight(&self, distance: f64) -> f64 {
        1.0 / distance.max(self.config.min_distance_m).powi(2)
    }
}

/// Heuristic parameters chosen from coarse signal-strength buckets.
///
/// Not a physical model: strong median signal suggests open space near the
/// anchors, weak suggests obstruction. Used only when nothing is calibrated.
pub fn adaptive_params(rssi_values: &[f64]) -> Option<CalibrationParams> {
    let median_rssi = median(rssi_values)?;
    let (reference_power, mut exponent) = if median_rssi > -50.0 {
        (-45.0, 1.5)
    } else if median_rssi < -80.0 {
        (-75.0, 3.0)
    } else {
        (-65.0, 2.0)
    };
    if std_dev(rssi_values).is_some_and(|sd| sd > 10.0) {
        exponent += 0.5;
    }
    Some(CalibrationParams::new(reference_power, exponent))
}

/// One calibration observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    /// Known distance (meters); ignored when a known point supplies geometry
    pub distance: f64,
    pub rssi: f64,
    pub anchor_id: Option<AnchorId>,
}

impl CalibrationPair {
    pub fn new(distance: f64, rssi: f64) -> Self {
        Self { distance, rssi, anchor_id: None }
    }

    pub fn for_anchor(anchor_id: impl Into<AnchorId>, distance: f64, rssi: f64) -> Self {
        Self { distance, rssi, anchor_id: Some(anchor_id.into()) }
    }
}

/// Surveyed position where calibration RSSI was recorded
#[derive(Debug, Clone, Copy)]
pub struct KnownPoint<'a> {
    pub registry: &'a Registry,
    pub x: f64,
    pub y: f64,
}

/// Fit global path-loss parameters.
///
/// OLS on `rssi = a + m * log10(d)`, then one Huber-reweighted pass.
/// With a known point, pairs that name a registered anchor take their
/// distance from the layout.
pub fn calibrate(pairs: &[CalibrationPair], known_point: Option<KnownPoint<'_>>) -> PositioningResult<CalibrationParams> {
    let points = log_distance_points(pairs, known_point);
    if points.len() < MIN_CALIBRATION_PAIRS {
        return Err(PositioningError::CalibrationDataInsufficient {
            valid_pairs: points.len(),
            required: MIN_CALIBRATION_PAIRS,
        });
    }

    let uniform = vec![1.0; points.len()];
    let (intercept, slope) = weighted_line_fit(&points, &uniform).ok_or(
        PositioningError::CalibrationDataInsufficient { valid_pairs: points.len(), required: MIN_CALIBRATION_PAIRS },
    )?;

    let residuals: Vec<f64> = points.iter().map(|(x, y)| y - (intercept + slope * x)).collect();
    let center = median(&residuals).unwrap_or(0.0);
    let spread = mad(&residuals, center).filter(|m| *m > 0.0).unwrap_or(1.0);
    let c = HUBER_TUNING * spread;
    let weights: Vec<f64> = residuals
        .iter()
        .map(|r| if r.abs() <= c { 1.0 } else { c / r.abs() })
        .collect();

    let (intercept, slope) = weighted_line_fit(&points, &weights).unwrap_or((intercept, slope));
    let params = CalibrationParams::new(
        intercept,
        (-slope / 10.0).clamp(MIN_PATH_LOSS_EXPONENT, MAX_PATH_LOSS_EXPONENT),
    );
    debug!(pairs = points.len(), %params, "path-loss calibration fitted");
    Ok(params)
}

/// Fit only the reference power for a fixed exponent.
///
/// The exponent is clamped to the same bounds as a full fit; a non-finite
/// exponent is rejected.
pub fn calibrate_reference_power(
    pairs: &[CalibrationPair],
    path_loss_exponent: f64,
    known_point: Option<KnownPoint<'_>>,
) -> PositioningResult<CalibrationParams> {
    if !path_loss_exponent.is_finite() {
        return Err(ConfigError::InvalidParameter {
            parameter: "path_loss_exponent".to_string(),
            value: path_loss_exponent.to_string(),
            reason: "must be finite".to_string(),
        }
        .into());
    }
    let exponent = path_loss_exponent.clamp(MIN_PATH_LOSS_EXPONENT, MAX_PATH_LOSS_EXPONENT);

    let points = log_distance_points(pairs, known_point);
    if points.len() < MIN_CALIBRATION_PAIRS {
        return Err(PositioningError::CalibrationDataInsufficient {
            valid_pairs: points.len(),
            required: MIN_CALIBRATION_PAIRS,
        });
    }
    let estimates: Vec<f64> = points.iter().map(|(x, y)| y + 10.0 * exponent * x).collect();
    let reference_power = mean(&estimates).ok_or(PositioningError::CalibrationDataInsufficient {
        valid_pairs: points.len(),
        required: MIN_CALIBRATION_PAIRS,
    })?;
    Ok(CalibrationParams::new(reference_power, exponent))
}

/// Fit each anchor separately; anchors without enough pairs are skipped
pub fn calibrate_per_anchor(
    pairs: &[CalibrationPair],
    known_point: Option<KnownPoint<'_>>,
) -> BTreeMap<AnchorId, CalibrationParams> {
    let mut grouped: BTreeMap<AnchorId, Vec<CalibrationPair>> = BTreeMap::new();
    for pair in pairs {
        if let Some(id) = &pair.anchor_id {
            grouped.entry(id.clone()).or_default().push(pair.clone());
        }
    }

    grouped
        .into_iter()
        .filter_map(|(id, group)| match calibrate(&group, known_point) {
            Ok(params) => Some((id, params)),
            Err(err) => {
                warn!(anchor = %id, %err, "skipping anchor calibration");
                None
            }
        })
        .collect()
}

/// `(log10(d), rssi)` for every usable pair
fn log_distance_points(pairs: &[CalibrationPair], known_point: Option<KnownPoint<'_>>) -> Vec<(f64, f64)> {
    pairs
        .iter()
        .filter_map(|pair| {
            let distance = match (known_point, &pair.anchor_id) {
                (Some(point), Some(id)) => point.registry.get(id).map(|a| a.distance_to(point.x, point.y))?,
                _ => pair.distance,
            };
            (distance.is_finite() && distance > 0.0 && pair.rssi.is_finite()).then(|| (distance.log10(), pair.rssi))
        })
        .collect()
}

/// Weighted least-squares line `y = a + m x`; `None` when every x is equal
fn weighted_line_fit(points: &[(f64, f64)], weights: &[f64]) -> Option<(f64, f64)> {
    let mut normal = Matrix2::<f64>::zeros();
    let mut rhs = Vector2::<f64>::zeros();
    for ((x, y), &w) in points.iter().zip(weights) {
        normal[(0, 0)] += w;
        normal[(0, 1)] += w * x;
        normal[(1, 0)] += w * x;
        normal[(1, 1)] += w * x * x;
        rhs[0] += w * y;
        rhs[1] += w * x * y;
    }

    let scale = normal[(0, 0)] * normal[(1, 1)];
    if scale <= 0.0 || normal.determinant().abs() <= 1e-12 * scale {
        return None;
    }
    let solution = normal.try_inverse()? * rhs;
    Some((solution[0], solution[1]))
}
