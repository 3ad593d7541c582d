//! Estimator configuration with TOML support.
//!
//! Provides the model architecture and measurement-window settings with
//! load/save capabilities for host training programs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FlopsError, Result};
use crate::formula;

fn default_start_idx() -> usize {
    20 // skip warmup/compilation steps
}

fn default_end_idx() -> usize {
    40
}

/// Model architecture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hidden dimension size (h).
    pub hidden_size: usize,
    /// Number of transformer layers (l).
    pub n_layer: usize,
    /// Sequence length (s).
    pub block_size: usize,
    /// Vocabulary size (v).
    pub vocab_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::gpt2_small()
    }
}

impl ModelConfig {
    /// GPT-2 small (~124M params).
    pub fn gpt2_small() -> Self {
        Self {
            hidden_size: 768,
            n_layer: 12,
            block_size: 1024,
            vocab_size: 50257,
        }
    }

    /// GPT-2 medium (~355M params).
    pub fn gpt2_medium() -> Self {
        Self {
            hidden_size: 1024,
            n_layer: 24,
            ..Self::gpt2_small()
        }
    }

    /// GPT-2 large (~774M params).
    pub fn gpt2_large() -> Self {
        Self {
            hidden_size: 1280,
            n_layer: 36,
            ..Self::gpt2_small()
        }
    }

    /// GPT-2 XL (~1.5B params).
    pub fn gpt2_xl() -> Self {
        Self {
            hidden_size: 1600,
            n_layer: 48,
            ..Self::gpt2_small()
        }
    }

    /// Exact parameter count, `None` if it overflows 128 bits.
    pub fn num_parameters(&self) -> Option<u128> {
        formula::parameter_count(self.hidden_size, self.n_layer, self.block_size, self.vocab_size)
    }

    /// Parameter count in billions.
    pub fn num_parameters_billion(&self) -> f64 {
        formula::parameters_billion(self.hidden_size, self.n_layer, self.block_size, self.vocab_size)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(FlopsError::InvalidConfig("hidden_size must be > 0".into()));
        }
        if self.n_layer == 0 {
            return Err(FlopsError::InvalidConfig("n_layer must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(FlopsError::InvalidConfig("block_size must be > 0".into()));
        }
        if self.vocab_size == 0 {
            return Err(FlopsError::InvalidConfig("vocab_size must be > 0".into()));
        }
        Ok(())
    }
}

/// Throughput estimator configuration.
///
/// Nothing here is checked on construction of the estimator; call
/// [`EstimatorConfig::validate`] to reject degenerate settings up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Samples per optimizer step summed across all workers.
    pub global_batch_size: usize,
    /// Whether activations are recomputed in the backward pass.
    #[serde(default)]
    pub activation_checkpointing: bool,
    /// Step index (0-based) at which timing starts.
    #[serde(default = "default_start_idx")]
    pub start_idx: usize,
    /// Step index (0-based) at which timing stops.
    #[serde(default = "default_end_idx")]
    pub end_idx: usize,
    /// Model architecture.
    pub model: ModelConfig,
}

impl EstimatorConfig {
    /// Config with the default 20..40 measurement window.
    pub fn new(global_batch_size: usize, model: ModelConfig) -> Self {
        Self {
            global_batch_size,
            model,
            activation_checkpointing: false,
            start_idx: default_start_idx(),
            end_idx: default_end_idx(),
        }
    }

    /// Enable or disable activation checkpointing.
    pub fn with_activation_checkpointing(mut self, enabled: bool) -> Self {
        self.activation_checkpointing = enabled;
        self
    }

    /// Override the measurement window.
    pub fn with_window(mut self, start_idx: usize, end_idx: usize) -> Self {
        self.start_idx = start_idx;
        self.end_idx = end_idx;
        self
    }

    /// Number of steps between the window bounds (0 if inverted).
    pub fn num_steps(&self) -> usize {
        self.end_idx.saturating_sub(self.start_idx)
    }

    /// Passes per token per parameter for this config.
    pub fn factor(&self) -> u32 {
        formula::checkpoint_factor(self.activation_checkpointing)
    }

    /// Load configuration from TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if self.global_batch_size == 0 {
            return Err(FlopsError::InvalidConfig(
                "global_batch_size must be > 0".into(),
            ));
        }
        if self.end_idx <= self.start_idx {
            return Err(FlopsError::InvalidConfig(format!(
                "end_idx ({}) must be greater than start_idx ({})",
                self.end_idx, self.start_idx
            )));
        }
        Ok(())
    }
}
