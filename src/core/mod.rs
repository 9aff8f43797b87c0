//! Core types and constants for the BLE positioning core

pub mod constants;
pub mod registry;
pub mod types;

pub use constants::*;
pub use registry::{load_registry, Registry};
pub use types::*;
