//! Error taxonomy and quality assessment

pub mod error;
pub mod quality;

pub use error::{PositioningError, PositioningResult};
pub use quality::{QualityAssessment, QualityConfig, QualityEstimator};
