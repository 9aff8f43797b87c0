//! Advisory quality figures for a solved position
//!
//! Nothing here blocks a solve: the labels and accuracy figure annotate the
//! estimate and feed the tracker's measurement noise.

use crate::core::{QualityLabel, StabilityLabel};
use crate::utils::stats::{median, rms};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_accuracy_m: f64,
    pub max_accuracy_m: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { min_accuracy_m: 0.5, max_accuracy_m: 50.0 }
    }
}

/// Quality figures for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub quality: QualityLabel,
    pub stability: StabilityLabel,
    /// Median conditioned RSSI across anchors (dBm), `None` without readings
    pub median_rssi: Option<f64>,
    /// Max minus min conditioned RSSI across anchors (dB)
    pub rssi_range: f64,
    /// Root mean square of the range residuals (meters)
    pub rmse: f64,
    /// Estimated position error (meters)
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct QualityEstimator {
    pub config: QualityConfig,
}

impl QualityEstimator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Label from the median RSSI
    pub fn classify_quality(median_rssi: f64) -> QualityLabel {
        if median_rssi > -55.0 {
            QualityLabel::Excellent
        } else if median_rssi > -65.0 {
            QualityLabel::Good
        } else if median_rssi > -75.0 {
            QualityLabel::Fair
        } else {
            QualityLabel::Poor
        }
    }

    /// Label from the RSSI spread across anchors
    pub fn classify_stability(rssi_range: f64) -> StabilityLabel {
        if rssi_range < 8.0 {
            StabilityLabel::High
        } else if rssi_range < 15.0 {
            StabilityLabel::Medium
        } else {
            StabilityLabel::Low
        }
    }

    /// Assess a cycle from its per-anchor conditioned RSSI, the solver's
    /// range residuals and its mean weighted squared residual (m²)
    pub fn assess(&self, rssi: &[f64], residuals: &[f64], mean_cost: f64) -> QualityAssessment {
        let median_rssi = median(rssi);
        let (quality, stability, rssi_range) = match median_rssi {
            Some(m) => {
                let range = rssi_range(rssi);
                (Self::classify_quality(m), Self::classify_stability(range), range)
            }
            None => (QualityLabel::Poor, StabilityLabel::Low, 0.0),
        };

        let rmse = rms(residuals);
        let raw = rmse * quality_multiplier(quality) * stability_multiplier(stability) * cost_multiplier(mean_cost);
        let accuracy = if raw.is_finite() {
            raw.clamp(self.config.min_accuracy_m, self.config.max_accuracy_m)
        } else {
            self.config.max_accuracy_m
        };

        QualityAssessment { quality, stability, median_rssi, rssi_range, rmse, accuracy }
    }
}

/// Max minus min, zero for fewer than two values
pub fn rssi_range(values: &[f64]) -> f64 {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if values.len() < 2 {
        0.0
    } else {
        hi - lo
    }
}

/// Per-anchor trust factor applied on top of the distance weight
pub fn anchor_weight_factor(rssi: f64, stability: StabilityLabel) -> f64 {
    let signal = if rssi > -60.0 {
        1.5
    } else if rssi < -80.0 {
        0.5
    } else {
        1.0
    };
    let steadiness = match stability {
        StabilityLabel::High => 1.2,
        StabilityLabel::Medium => 1.0,
        StabilityLabel::Low => 0.8,
    };
    signal * steadiness
}

/// Weight factor from the angular spread of the other anchors as seen from
/// `positions[index]`: 1.2 above one radian on average, 0.7 below half a
/// radian, 1.0 otherwise or with fewer than three anchors
pub fn geometric_factor(index: usize, positions: &[Vector2<f64>]) -> f64 {
    let Some(current) = positions.get(index) else {
        return 1.0;
    };
    if positions.len() < 3 {
        return 1.0;
    }
    let rays: Vec<Vector2<f64>> = positions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, p)| p - current)
        .collect();

    let mut total = 0.0;
    let mut count = 0usize;
    for (i, a) in rays.iter().enumerate() {
        for b in &rays[i + 1..] {
            let norms = a.norm() * b.norm();
            if norms > 0.0 {
                total += (a.dot(b) / norms).clamp(-1.0, 1.0).acos();
                count += 1;
            }
        }
    }
    if count == 0 {
        return 1.0;
    }
    let mean_angle = total / count as f64;
    if mean_angle > 1.0 {
        1.2
    } else if mean_angle < 0.5 {
        0.7
    } else {
        1.0
    }
}

fn cost_multiplier(mean_cost: f64) -> f64 {
    if !mean_cost.is_finite() || mean_cost > 1.0 {
        1.5
    } else if mean_cost < 0.1 {
        0.8
    } else {
        1.0
    }
}

fn quality_multiplier(quality: QualityLabel) -> f64 {
    match quality {
        QualityLabel::Excellent => 0.5,
        QualityLabel::Good => 0.8,
        QualityLabel::Fair => 1.2,
        QualityLabel::Poor => 2.0,
    }
}

fn stability_multiplier(stability: StabilityLabel) -> f64 {
    match stability {
        StabilityLabel::High => 0.7,
        StabilityLabel::Medium => 1.0,
        StabilityLabel::Low => 1.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(QualityEstimator::classify_quality(-50.0), QualityLabel::Excellent);
        assert_eq!(QualityEstimator::classify_quality(-55.0), QualityLabel::Good);
        assert_eq!(QualityEstimator::classify_quality(-70.0), QualityLabel::Fair);
        assert_eq!(QualityEstimator::classify_quality(-75.0), QualityLabel::Poor);
    }

    #[test]
    fn test_stability_thresholds() {
        assert_eq!(QualityEstimator::classify_stability(0.0), StabilityLabel::High);
        assert_eq!(QualityEstimator::classify_stability(8.0), StabilityLabel::Medium);
        assert_eq!(QualityEstimator::classify_stability(15.0), StabilityLabel::Low);
    }

    #[test]
    fn test_accuracy_combines_multipliers() {
        let estimator = QualityEstimator::default();
        // median -68 (fair), range 10 (medium)
        let assessment = estimator.assess(&[-63.0, -68.0, -73.0], &[2.0, -2.0, 2.0], 0.5);
        assert_eq!(assessment.quality, QualityLabel::Fair);
        assert_eq!(assessment.stability, StabilityLabel::Medium);
        assert_abs_diff_eq!(assessment.rmse, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(assessment.accuracy, 2.4, epsilon = 1e-12);
    }

    #[test]
    fn test_accuracy_is_clamped() {
        let estimator = QualityEstimator::default();
        let tight = estimator.assess(&[-50.0, -52.0, -51.0], &[0.0, 0.0, 0.0], 0.0);
        assert_eq!(tight.accuracy, 0.5);

        let loose = estimator.assess(&[-90.0, -60.0, -95.0], &[40.0, 45.0, 50.0], 2_000.0);
        assert_eq!(loose.accuracy, 50.0);
        assert_eq!(loose.stability, StabilityLabel::Low);
    }

    #[test]
    fn test_empty_readings_are_poor() {
        let assessment = QualityEstimator::default().assess(&[], &[], 0.0);
        assert_eq!(assessment.quality, QualityLabel::Poor);
        assert_eq!(assessment.median_rssi, None);
        assert_eq!(assessment.accuracy, 0.5);
    }

    #[test]
    fn test_solve_cost_scales_accuracy() {
        let estimator = QualityEstimator::default();
        let rssi = [-63.0, -68.0, -73.0];
        let residuals = [2.0, -2.0, 2.0];
        assert_abs_diff_eq!(estimator.assess(&rssi, &residuals, 0.05).accuracy, 1.92, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.assess(&rssi, &residuals, 0.5).accuracy, 2.4, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.assess(&rssi, &residuals, 4.0).accuracy, 3.6, epsilon = 1e-12);
        assert_abs_diff_eq!(estimator.assess(&rssi, &residuals, f64::NAN).accuracy, 3.6, epsilon = 1e-12);
    }

    #[test]
    fn test_geometric_factor() {
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ];
        assert_eq!(geometric_factor(0, &square), 1.2);

        let line = [Vector2::new(0.0, 0.0), Vector2::new(5.0, 0.0), Vector2::new(10.0, 0.0)];
        assert_eq!(geometric_factor(0, &line), 0.7);
        assert_eq!(geometric_factor(1, &line), 1.2);

        // rays 0.6 rad apart
        let fan = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0 * 0.6f64.cos(), 10.0 * 0.6f64.sin()),
        ];
        assert_eq!(geometric_factor(0, &fan), 1.0);

        assert_eq!(geometric_factor(0, &square[..2]), 1.0);
        assert_eq!(geometric_factor(7, &square), 1.0);
        assert_eq!(geometric_factor(0, &[Vector2::zeros(); 3]), 1.0);
    }

    #[test]
    fn test_anchor_weight_factor() {
        assert_abs_diff_eq!(anchor_weight_factor(-55.0, StabilityLabel::High), 1.8, epsilon = 1e-12);
        assert_eq!(anchor_weight_factor(-70.0, StabilityLabel::Medium), 1.0);
        assert_abs_diff_eq!(anchor_weight_factor(-85.0, StabilityLabel::Low), 0.4, epsilon = 1e-12);
    }
}
