//! Error handling module for parcopy operations.
//!
//! This module provides the crate's error taxonomy:
//! - Fatal pre-planning failures (connectivity, schema, estimation, range)
//! - Planning failures that must surface before any worker is dispatched
//! - Ambient configuration and I/O errors
//!
//! Individual worker failures are deliberately *not* part of this taxonomy:
//! workers are fire-and-forget, their exit status is only logged (see
//! `export::dispatcher`).

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, EstimationError, ParcopyError, PlanError, RangeError, Result,
    SchemaError,
};
