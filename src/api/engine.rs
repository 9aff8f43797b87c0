//! Update-cycle pipeline
//!
//! One call turns a batch of raw RSSI samples into a [`PositionEstimate`]:
//! conditioning, distance conversion, multilateration, quality assessment
//! and, when the caller passes per-device state, temporal tracking.

use crate::algorithms::path_loss::{CalibrationSet, DistanceModel};
use crate::algorithms::trilateration::{GeometrySolver, SolverInput};
use crate::core::{AnchorId, ConditionedReading, PositionEstimate, Registry, RssiSample, Timestamp, MIN_ANCHORS_2D};
use crate::processing::conditioner::{RssiConditioner, RssiSmoother};
use crate::processing::kalman::{DeviceState, TrackerRegistry};
use crate::utils::config::PositioningConfig;
use crate::validation::error::{PositioningError, PositioningResult};
use crate::validation::quality::{anchor_weight_factor, rssi_range, QualityEstimator};
use nalgebra::Vector2;
use tracing::{debug, debug_span, trace, warn};

/// Conditioned inputs of one cycle, before solving
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReadings {
    /// Cycle timestamp: the newest valid sample
    pub t: Timestamp,
    pub readings: Vec<ConditionedReading>,
}

impl CycleReadings {
    pub fn rssi(&self) -> Vec<f64> {
        self.readings.iter().map(|r| r.rssi).collect()
    }
}

/// Stateless positioning pipeline.
///
/// Shareable across threads; per-device state lives in [`DeviceState`]
/// values owned by the caller.
#[derive(Debug, Clone)]
pub struct PositioningEngine {
    config: PositioningConfig,
    conditioner: RssiConditioner,
    distance_model: DistanceModel,
    solver: GeometrySolver,
    quality: QualityEstimator,
}

impl PositioningEngine {
    /// Build an engine, rejecting invalid configuration
    pub fn new(config: PositioningConfig) -> PositioningResult<Self> {
        let validation = config.validate();
        for warning in &validation.warnings {
            warn!(%warning, "configuration warning");
        }
        validation.into_result()?;
        Ok(Self::build(config))
    }

    fn build(config: PositioningConfig) -> Self {
        Self {
            conditioner: RssiConditioner::new(config.conditioner.clone()),
            distance_model: DistanceModel::new(config.distance.clone()),
            solver: GeometrySolver::new(config.solver.clone()),
            quality: QualityEstimator::new(config.quality.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PositioningConfig {
        &self.config
    }

    /// Fresh per-device state using this engine's tracker settings
    pub fn new_device_state(&self) -> DeviceState {
        DeviceState::new(self.config.tracker.clone())
    }

    /// Empty device map using this engine's tracker settings
    pub fn tracker_registry(&self) -> TrackerRegistry {
        TrackerRegistry::new(self.config.tracker.clone())
    }

    /// Condition raw samples and convert them into weighted ranges.
    ///
    /// Anchors without enough clean samples are left out. When a smoother is
    /// given and smoothing is enabled, it runs on each conditioned value.
    pub fn condition_readings(
        &self,
        samples: &[RssiSample],
        registry: &Registry,
        calibration: &CalibrationSet,
        smoother: Option<&mut RssiSmoother>,
    ) -> CycleReadings {
        let windows = self.conditioner.collect_windows(samples, registry);
        let mut conditioned: Vec<(AnchorId, f64)> = Vec::with_capacity(windows.per_anchor.len());
        for (anchor_id, window) in &windows.per_anchor {
            match self.conditioner.condition(window) {
                Ok(result) => conditioned.push((anchor_id.clone(), result.value)),
                Err(err) => debug!(anchor = %anchor_id, %err, "anchor excluded from cycle"),
            }
        }

        if conditioned.len() >= MIN_ANCHORS_2D && self.config.conditioner.smoothing {
            if let Some(smoother) = smoother {
                for (anchor_id, value) in conditioned.iter_mut() {
                    *value = smoother.smooth(anchor_id, *value, windows.now, &self.config.conditioner);
                }
            }
        }

        let cycle_rssi: Vec<f64> = conditioned.iter().map(|(_, v)| *v).collect();
        let stability = QualityEstimator::classify_stability(rssi_range(&cycle_rssi));
        let readings = conditioned
            .into_iter()
            .map(|(anchor_id, rssi)| {
                let (params, source) = self.distance_model.resolve(calibration, &anchor_id, &cycle_rssi);
                let distance = self.distance_model.distance(&params, rssi);
                let weight = self.distance_model.weight(distance) * anchor_weight_factor(rssi, stability);
                trace!(anchor = %anchor_id, rssi, distance, weight, ?source, "reading");
                ConditionedReading { anchor_id, rssi, distance, weight }
            })
            .collect();

        CycleReadings { t: windows.now, readings }
    }

    /// Run one update cycle.
    ///
    /// With `state`, the previous track seeds the solver and the raw fix is
    /// filtered; without it the raw fix is returned. Failed cycles leave
    /// `state` untouched: smoothing runs on a copy that is committed only
    /// once the solve succeeds.
    pub fn estimate_position(
        &self,
        device_id: &str,
        samples: &[RssiSample],
        registry: &Registry,
        calibration: &CalibrationSet,
        state: Option<&mut DeviceState>,
    ) -> PositioningResult<PositionEstimate> {
        let _span = debug_span!("estimate_position", device = device_id).entered();

        let mut smoother = state
            .as_deref()
            .filter(|_| self.config.conditioner.smoothing)
            .map(|s| s.smoother.clone());
        let cycle = self.condition_readings(samples, registry, calibration, smoother.as_mut());
        if cycle.readings.len() < MIN_ANCHORS_2D {
            debug!(usable = cycle.readings.len(), "not enough anchors, skipping cycle");
            return Err(PositioningError::InsufficientAnchors {
                available: cycle.readings.len(),
                required: MIN_ANCHORS_2D,
            });
        }

        let inputs: Vec<SolverInput> = cycle
            .readings
            .iter()
            .filter_map(|reading| registry.get(&reading.anchor_id).map(|a| SolverInput::from_reading(reading, a)))
            .collect();
        let prior = state.as_deref().and_then(|s| s.tracker.position());
        let outcome = self.solver.solve(&inputs, prior)?;
        let mean_cost = outcome.cost / outcome.residuals.len().max(1) as f64;
        let assessment = self.quality.assess(&cycle.rssi(), &outcome.residuals, mean_cost);

        let raw = outcome.position;
        let (filtered, velocity) = match state {
            Some(device) => {
                if let Some(smoother) = smoother {
                    device.smoother = smoother;
                }
                let r = device.tracker.measurement_variance(assessment.accuracy);
                let filtered = device.tracker.step(raw, r, cycle.t);
                (filtered, device.tracker.velocity().unwrap_or_else(Vector2::zeros))
            }
            None => (raw, Vector2::zeros()),
        };

        let estimate = PositionEstimate {
            x: filtered.x,
            y: filtered.y,
            accuracy: assessment.accuracy,
            anchors_used: outcome.anchor_ids.len() as u32,
            quality: assessment.quality,
            stability: assessment.stability,
            converged: outcome.converged,
            t: cycle.t,
            raw_x: raw.x,
            raw_y: raw.y,
            vx: velocity.x,
            vy: velocity.y,
            method: outcome.method,
        };
        debug!(%estimate, method = ?estimate.method, "position estimated");
        Ok(estimate)
    }

    /// [`estimate_position`](Self::estimate_position) with the device's
    /// state looked up (or created) in `devices`
    pub fn estimate_for_device(
        &self,
        device_id: &str,
        samples: &[RssiSample],
        registry: &Registry,
        calibration: &CalibrationSet,
        devices: &mut TrackerRegistry,
    ) -> PositioningResult<PositionEstimate> {
        let state = devices.get_or_insert(device_id);
        self.estimate_position(device_id, samples, registry, calibration, Some(state))
    }
}

impl Default for PositioningEngine {
    fn default() -> Self {
        Self::build(PositioningConfig::default())
    }
}
