use crate::core::Timestamp;
use crate::processing::conditioner::RssiSmoother;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Where the measurement noise `R` of a position fix comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MeasurementNoise {
    /// Constant variance (m²) for every fix
    Fixed { variance: f64 },
    /// `accuracy²` from the quality estimator, floored
    FromAccuracy { min_variance: f64 },
}

impl Default for MeasurementNoise {
    fn default() -> Self {
        MeasurementNoise::FromAccuracy { min_variance: 0.25 }
    }
}

/// Tracker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Initial covariance diagonal
    pub initial_covariance: f64,
    /// Position process noise per second
    pub process_noise_position: f64,
    /// Velocity process noise per second
    pub process_noise_velocity: f64,
    pub measurement_noise: MeasurementNoise,
    /// Smallest time step applied by `predict` (seconds)
    pub min_dt_s: f64,
    /// Silence after which the track restarts at the next fix
    pub max_time_gap_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            initial_covariance: 100.0,
            process_noise_position: 0.1,
            process_noise_velocity: 1.0,
            measurement_noise: MeasurementNoise::default(),
            min_dt_s: 1e-3,
            max_time_gap_ms: 10_000,
        }
    }
}

/// Filter state: `[x, y, vx, vy]` and its covariance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerState {
    pub state: Vector4<f64>,
    pub covariance: Matrix4<f64>,
    pub last_t: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerStatus {
    Uninitialized,
    Tracking,
}

/// Constant-velocity Kalman filter over planar position fixes
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    pub config: TrackerConfig,
    state: Option<TrackerState>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config, state: None }
    }

    pub fn status(&self) -> TrackerStatus {
        if self.state.is_some() {
            TrackerStatus::Tracking
        } else {
            TrackerStatus::Uninitialized
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&TrackerState> {
        self.state.as_ref()
    }

    /// Start a track at `z` with zero velocity
    pub fn initialize(&mut self, z: Vector2<f64>, t: Timestamp) {
        self.state = Some(TrackerState {
            state: Vector4::new(z.x, z.y, 0.0, 0.0),
            covariance: Matrix4::identity() * self.config.initial_covariance,
            last_t: t,
        });
    }

    /// Measurement variance for a fix with the given accuracy figure
    pub fn measurement_variance(&self, accuracy: f64) -> f64 {
        match self.config.measurement_noise {
            MeasurementNoise::Fixed { variance } => variance,
            MeasurementNoise::FromAccuracy { min_variance } => {
                let variance = accuracy * accuracy;
                if variance.is_finite() {
                    variance.max(min_variance)
                } else {
                    min_variance
                }
            }
        }
    }

    /// Propagate the state `dt_s` seconds ahead. Steps below `min_dt_s`,
    /// zero or negative ones included, are raised to it.
    pub fn predict(&mut self, dt_s: f64) {
        let dt = if dt_s.is_finite() { dt_s.max(self.config.min_dt_s) } else { self.config.min_dt_s };
        let f = transition(dt);
        let q = Matrix4::from_diagonal(&Vector4::new(
            self.config.process_noise_position,
            self.config.process_noise_position,
            self.config.process_noise_velocity,
            self.config.process_noise_velocity,
        )) * dt;

        if let Some(track) = self.state.as_mut() {
            track.state = f * track.state;
            track.covariance = f * track.covariance * f.transpose() + q;
        }
    }

    /// Fold in a position fix with isotropic variance `r`.
    ///
    /// Returns false when the innovation covariance is singular and the
    /// fix was skipped.
    pub fn update(&mut self, z: Vector2<f64>, r: f64) -> bool {
        let Some(track) = self.state.as_mut() else {
            return false;
        };
        let h = observation();
        let r = Matrix2::identity() * r;

        let innovation = z - h * track.state;
        let s = h * track.covariance * h.transpose() + r;
        let Some(s_inv) = s.try_inverse() else {
            debug!("singular innovation covariance, skipping update");
            return false;
        };
        let k = track.covariance * h.transpose() * s_inv;

        track.state += k * innovation;
        let i_kh = Matrix4::identity() - k * h;
        let joseph = i_kh * track.covariance * i_kh.transpose() + k * r * k.transpose();
        track.covariance = (joseph + joseph.transpose()) * 0.5;
        true
    }

    /// Run one cycle for a fix taken at `t` and return the filtered
    /// position.
    ///
    /// The first fix, or one arriving after more than `max_time_gap_ms` of
    /// silence, restarts the track.
    pub fn step(&mut self, z: Vector2<f64>, r: f64, t: Timestamp) -> Vector2<f64> {
        let last_t = match &self.state {
            Some(track) => track.last_t,
            None => {
                self.initialize(z, t);
                return z;
            }
        };

        let gap_ms = t.saturating_sub(last_t);
        if gap_ms > self.config.max_time_gap_ms {
            debug!(gap_ms, "track gap exceeded, restarting");
            self.initialize(z, t);
            return z;
        }

        let dt_s = (t as f64 - last_t as f64) / 1000.0;
        self.predict(dt_s);
        self.update(z, r);
        if let Some(track) = self.state.as_mut() {
            track.last_t = last_t.max(t);
        }
        self.position().unwrap_or(z)
    }

    pub fn position(&self) -> Option<Vector2<f64>> {
        self.state.as_ref().map(|s| Vector2::new(s.state[0], s.state[1]))
    }

    pub fn velocity(&self) -> Option<Vector2<f64>> {
        self.state.as_ref().map(|s| Vector2::new(s.state[2], s.state[3]))
    }

    /// Position standard deviations
    pub fn position_uncertainty(&self) -> Option<Vector2<f64>> {
        self.state
            .as_ref()
            .map(|s| Vector2::new(s.covariance[(0, 0)].sqrt(), s.covariance[(1, 1)].sqrt()))
    }

    /// Constant-velocity extrapolation without touching the filter
    pub fn predict_future_position(&self, future_dt_s: f64) -> Option<Vector2<f64>> {
        let position = self.position()?;
        if future_dt_s <= 0.0 {
            return Some(position);
        }
        Some(position + self.velocity()? * future_dt_s)
    }

    /// Back to uninitialized; the next fix starts a new track
    pub fn reset(&mut self) {
        self.state = None;
    }
}

fn transition(dt: f64) -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, dt,  0.0,
        0.0, 1.0, 0.0, dt,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

fn observation() -> Matrix2x4<f64> {
    Matrix2x4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
    )
}

/// Everything that persists between cycles for one device
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub tracker: Tracker,
    pub smoother: RssiSmoother,
}

impl DeviceState {
    pub fn new(config: TrackerConfig) -> Self {
        Self { tracker: Tracker::new(config), smoother: RssiSmoother::new() }
    }
}

/// Drop a device's track and smoothing history
pub fn reset_tracker(state: &mut DeviceState) {
    state.tracker.reset();
    state.smoother.clear();
}

/// Per-device state owned by the caller, keyed by device id
#[derive(Debug, Clone, Default)]
pub struct TrackerRegistry {
    config: TrackerConfig,
    devices: HashMap<String, DeviceState>,
}

impl TrackerRegistry {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config, devices: HashMap::new() }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceState> {
        self.devices.get(device_id)
    }

    pub fn get_or_insert(&mut self, device_id: &str) -> &mut DeviceState {
        let config = &self.config;
        self.devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceState::new(config.clone()))
    }

    /// Reset a device's state; false if the device is unknown
    pub fn reset(&mut self, device_id: &str) -> bool {
        match self.devices.get_mut(device_id) {
            Some(state) => {
                reset_tracker(state);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, device_id: &str) -> Option<DeviceState> {
        self.devices.remove(device_id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AnchorId;
    use crate::processing::conditioner::ConditionerConfig;
    use approx::assert_abs_diff_eq;

    fn assert_symmetric_psd(tracker: &Tracker) {
        let p = tracker.state().unwrap().covariance;
        assert!((p - p.transpose()).amax() < 1e-9);
        let eigen = p.symmetric_eigen();
        assert!(eigen.eigenvalues.iter().all(|v| *v >= -1e-9));
    }

    #[test]
    fn test_first_fix_initializes() {
        let mut tracker = Tracker::default();
        assert_eq!(tracker.status(), TrackerStatus::Uninitialized);

        let out = tracker.step(Vector2::new(2.0, 3.0), 1.0, 1_000);
        assert_eq!(out, Vector2::new(2.0, 3.0));
        assert_eq!(tracker.status(), TrackerStatus::Tracking);
        assert_eq!(tracker.velocity(), Some(Vector2::zeros()));
        assert_eq!(tracker.state().unwrap().covariance, Matrix4::identity() * 100.0);
    }

    #[test]
    fn test_converges_on_stationary_target() {
        let mut tracker = Tracker::default();
        let truth = Vector2::new(5.0, 3.0);
        for i in 0..30u64 {
            let noise = if i % 2 == 0 { 0.2 } else { -0.2 };
            tracker.step(truth + Vector2::new(noise, -noise), 1.0, i * 500);
            assert_symmetric_psd(&tracker);
        }
        let position = tracker.position().unwrap();
        assert!((position - truth).norm() < 0.5);
        assert!(tracker.position_uncertainty().unwrap().x < 1.0);
    }

    #[test]
    fn test_noiseless_fixes_collapse_covariance() {
        let mut tracker = Tracker::new(TrackerConfig {
            process_noise_position: 1e-6,
            process_noise_velocity: 1e-6,
            ..Default::default()
        });
        let fix = Vector2::new(7.5, -2.0);
        for i in 0..25u64 {
            let out = tracker.step(fix, 0.01, i * 1_000);
            assert_eq!(out, fix);
            assert_symmetric_psd(&tracker);
        }

        let track = tracker.state().unwrap();
        assert_eq!(track.state, Vector4::new(7.5, -2.0, 0.0, 0.0));
        let diagonal = track.covariance.diagonal();
        assert!(diagonal.iter().all(|v| *v < 5e-3), "{diagonal}");
        assert!(diagonal[2] < 1e-4 && diagonal[3] < 1e-4, "{diagonal}");
    }

    #[test]
    fn test_learns_constant_velocity() {
        let mut tracker = Tracker::default();
        for i in 0..40u64 {
            tracker.step(Vector2::new(i as f64, 2.0), 0.01, i * 1_000);
        }
        let velocity = tracker.velocity().unwrap();
        assert_abs_diff_eq!(velocity.x, 1.0, epsilon = 0.1);
        assert_abs_diff_eq!(velocity.y, 0.0, epsilon = 0.1);

        let ahead = tracker.predict_future_position(2.0).unwrap();
        assert!(ahead.x > tracker.position().unwrap().x + 1.5);
    }

    #[test]
    fn test_non_positive_dt_is_floored() {
        let mut tracker = Tracker::default();
        tracker.step(Vector2::new(1.0, 1.0), 1.0, 5_000);
        tracker.step(Vector2::new(1.2, 0.8), 1.0, 5_000);
        tracker.step(Vector2::new(1.1, 0.9), 1.0, 4_000);

        let track = tracker.state().unwrap();
        assert!(track.state.iter().all(|v| v.is_finite()));
        assert_eq!(track.last_t, 5_000);
        assert_symmetric_psd(&tracker);
    }

    #[test]
    fn test_long_gap_restarts_track() {
        let mut tracker = Tracker::default();
        tracker.step(Vector2::new(0.0, 0.0), 1.0, 0);
        tracker.step(Vector2::new(0.5, 0.0), 1.0, 1_000);

        let out = tracker.step(Vector2::new(20.0, 20.0), 1.0, 30_000);
        assert_eq!(out, Vector2::new(20.0, 20.0));
        assert_eq!(tracker.velocity(), Some(Vector2::zeros()));
    }

    #[test]
    fn test_measurement_variance_modes() {
        let tracker = Tracker::default();
        assert_eq!(tracker.measurement_variance(2.0), 4.0);
        assert_eq!(tracker.measurement_variance(0.1), 0.25);
        assert_eq!(tracker.measurement_variance(f64::NAN), 0.25);

        let fixed = Tracker::new(TrackerConfig {
            measurement_noise: MeasurementNoise::Fixed { variance: 9.0 },
            ..Default::default()
        });
        assert_eq!(fixed.measurement_variance(1.0), 9.0);
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let mut tracker = Tracker::default();
        tracker.step(Vector2::new(1.0, 1.0), 1.0, 0);
        tracker.reset();
        assert_eq!(tracker.status(), TrackerStatus::Uninitialized);
        assert!(tracker.position().is_none());
        assert!(!tracker.update(Vector2::new(1.0, 1.0), 1.0));
    }

    #[test]
    fn test_registry_lifecycle() {
        let mut registry = TrackerRegistry::default();
        assert!(registry.is_empty());

        let state = registry.get_or_insert("phone-1");
        state.tracker.step(Vector2::new(1.0, 2.0), 1.0, 0);
        state.smoother.smooth(&AnchorId::from("A"), -60.0, 0, &ConditionerConfig::default());
        registry.get_or_insert("phone-2");
        assert_eq!(registry.len(), 2);

        assert!(registry.reset("phone-1"));
        let state = registry.get("phone-1").unwrap();
        assert!(!state.tracker.is_initialized());
        assert!(state.smoother.is_empty());
        assert!(!registry.reset("unknown"));

        assert!(registry.remove("phone-2").is_some());
        assert_eq!(registry.device_ids().collect::<Vec<_>>(), vec!["phone-1"]);
    }
}
