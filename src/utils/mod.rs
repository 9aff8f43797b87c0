//! Configuration, logging and shared statistics

pub mod config;
pub mod logging;
pub mod stats;

pub use config::{ConfigError, PositioningConfig, ValidationResult};
pub use logging::{init_logging, LogLevel};
