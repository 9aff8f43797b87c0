//! Error taxonomy for the positioning core

use crate::core::AnchorId;
use crate::utils::config::ConfigError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type PositioningResult<T> = Result<T, PositioningError>;

/// Errors surfaced by the positioning core.
///
/// Per-anchor problems are absorbed inside a cycle; only whole-cycle
/// failures and boundary contract violations reach the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositioningError {
    /// Fewer usable anchors than a 2D fix needs. Skip this cycle.
    #[error("insufficient anchors: {available} usable, {required} required")]
    InsufficientAnchors { available: usize, required: usize },

    /// Anchor layout cannot constrain a position, even for the fallback.
    #[error("degenerate anchor geometry: {reason}")]
    DegenerateGeometry { reason: String },

    /// Not enough valid (distance, rssi) pairs to fit a path-loss model.
    #[error("calibration needs {required} valid pairs, got {valid_pairs}")]
    CalibrationDataInsufficient { valid_pairs: usize, required: usize },

    /// Non-finite or out-of-range RSSI. Dropped before the solver.
    #[error("invalid sample from anchor {anchor_id}: rssi {rssi}")]
    InvalidSample { anchor_id: AnchorId, rssi: f64 },

    /// Registry contract violation
    #[error("duplicate anchor id {id}")]
    DuplicateAnchor { id: AnchorId },

    #[error("anchor {id} has non-finite coordinates")]
    InvalidAnchorPosition { id: AnchorId },

    /// Malformed beacon map text
    #[error("beacon map line {line}: {reason}")]
    BeaconMap { line: usize, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PositioningError {
    /// Whether the caller can carry on (skip the cycle, use defaults)
    /// rather than fix its inputs.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PositioningError::InsufficientAnchors { .. }
            | PositioningError::DegenerateGeometry { .. }
            | PositioningError::CalibrationDataInsufficient { .. }
            | PositioningError::InvalidSample { .. } => true,
            PositioningError::DuplicateAnchor { .. }
            | PositioningError::InvalidAnchorPosition { .. }
            | PositioningError::BeaconMap { .. }
            | PositioningError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PositioningError::InsufficientAnchors { available: 2, required: 3 };
        assert_eq!(err.to_string(), "insufficient anchors: 2 usable, 3 required");

        let err = PositioningError::DuplicateAnchor { id: AnchorId::from("beacon_1") };
        assert_eq!(err.to_string(), "duplicate anchor id beacon_1");
    }

    #[test]
    fn test_recoverability() {
        assert!(PositioningError::InsufficientAnchors { available: 0, required: 3 }.is_recoverable());
        assert!(PositioningError::CalibrationDataInsufficient { valid_pairs: 1, required: 2 }.is_recoverable());
        assert!(!PositioningError::DuplicateAnchor { id: AnchorId::from("a") }.is_recoverable());
    }
}
