//! Core types and formulas shared across gptflops crates.
//!
//! Provides:
//! - Centralized error types via thiserror
//! - Configuration management with TOML support
//! - Closed-form parameter and FLOPs estimates for GPT-style models

pub mod config;
pub mod error;
pub mod estimate;
pub mod formula;

// Re-export commonly used types
pub use config::{EstimatorConfig, ModelConfig};
pub use error::{FlopsError, Result};
pub use estimate::ThroughputEstimate;
