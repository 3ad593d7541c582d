//! Centralized error types for gptflops.
//!
//! Uses thiserror for ergonomic error handling with context.

use thiserror::Error;

/// Main error type for gptflops operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FlopsError {
    /// Invalid model or estimator configuration detected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Window end fired without an open measurement window.
    #[error("Measurement window ending at step {end_idx} was never started")]
    WindowNotStarted { end_idx: usize },

    /// Window bounds leave no steps to average over.
    #[error("Empty measurement window: start_idx={start_idx}, end_idx={end_idx}")]
    EmptyWindow { start_idx: usize, end_idx: usize },

    /// Step-end notification reported zero participating devices.
    #[error("Device count must be > 0 to normalize throughput")]
    NoDevices,

    /// Clock did not advance across the window.
    #[error("No wall-clock time elapsed across {num_steps} steps")]
    ZeroElapsed { num_steps: usize },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, FlopsError>;

impl FlopsError {
    /// Check if error comes from the caller firing step events out of order
    /// or with inconsistent window bounds.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            FlopsError::WindowNotStarted { .. }
                | FlopsError::EmptyWindow { .. }
                | FlopsError::NoDevices
        )
    }
}
