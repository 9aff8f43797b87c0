//! Core data types for the positioning pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds on the caller's clock
pub type Timestamp = u64;

/// Opaque anchor identifier (beacon name or MAC address)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AnchorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Fixed anchor with known planar coordinates (meters)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPosition {
    pub id: AnchorId,
    pub x: f64,
    pub y: f64,
}

impl AnchorPosition {
    pub fn new(id: impl Into<AnchorId>, x: f64, y: f64) -> Self {
        Self { id: id.into(), x, y }
    }

    /// Euclidean distance to a planar point
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// One RSSI observation produced by the external scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssiSample {
    pub anchor_id: AnchorId,
    /// Signal strength in dBm
    pub rssi: f64,
    pub t: Timestamp,
}

impl RssiSample {
    pub fn new(anchor_id: impl Into<AnchorId>, rssi: f64, t: Timestamp) -> Self {
        Self { anchor_id: anchor_id.into(), rssi, t }
    }
}

/// Per-anchor reading after conditioning and distance conversion.
/// Lives for a single update cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionedReading {
    pub anchor_id: AnchorId,
    /// Conditioned RSSI (dBm)
    pub rssi: f64,
    /// Estimated range (meters)
    pub distance: f64,
    /// Relative trust for the solver
    pub weight: f64,
}

/// Signal quality class derived from the median RSSI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityLabel {
    pub fn description(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => "excellent",
            QualityLabel::Good => "good",
            QualityLabel::Fair => "fair",
            QualityLabel::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Signal stability class derived from the RSSI spread across anchors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityLabel {
    High,
    Medium,
    Low,
}

impl fmt::Display for StabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StabilityLabel::High => "high",
            StabilityLabel::Medium => "medium",
            StabilityLabel::Low => "low",
        };
        f.write_str(s)
    }
}

/// Which solver branch produced the raw position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    LevenbergMarquardt,
    LinearLeastSquares,
    WeightedCentroid,
}

/// Output of one update cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    /// Filtered position (meters)
    pub x: f64,
    pub y: f64,
    /// Estimated position error (meters)
    pub accuracy: f64,
    pub anchors_used: u32,
    pub quality: QualityLabel,
    pub stability: StabilityLabel,
    /// Whether the primary solver met its step tolerance
    pub converged: bool,
    pub t: Timestamp,
    /// Unfiltered solver output
    pub raw_x: f64,
    pub raw_y: f64,
    /// Tracker velocity (m/s), zero without a tracker
    pub vx: f64,
    pub vy: f64,
    pub method: SolveMethod,
}

impl PositionEstimate {
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Planar distance to another estimate
    pub fn distance_2d_to(&self, other: &PositionEstimate) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

impl fmt::Display for PositionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}) ±{:.2} m [{} anchors, {}, {}]",
            self.x, self.y, self.accuracy, self.anchors_used, self.quality, self.stability
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_distance() {
        let anchor = AnchorPosition::new("B1", 0.0, 0.0);
        assert_eq!(anchor.distance_to(3.0, 4.0), 5.0);
    }

    #[test]
    fn test_anchor_id_ordering() {
        let a = AnchorId::from("beacon_1");
        let b = AnchorId::from("beacon_2");
        assert!(a < b);
        assert_eq!(a.to_string(), "beacon_1");
    }

    #[test]
    fn test_labels_serialize_lowercase() {
        let json = serde_json::to_string(&QualityLabel::Excellent).unwrap();
        assert_eq!(json, "\"excellent\"");
        let json = serde_json::to_string(&StabilityLabel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
