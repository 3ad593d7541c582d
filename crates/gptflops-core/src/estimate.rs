//! Throughput figures derived from one timed window of training steps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EstimatorConfig;
use crate::error::{FlopsError, Result};
use crate::formula;

/// Result of one completed measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputEstimate {
    /// Steps between window start and window end.
    pub num_steps: usize,
    /// Devices the aggregate figure was normalized by.
    pub num_devices: usize,
    /// Wall-clock seconds across the whole window.
    pub total_time_secs: f64,
    /// Average wall-clock seconds per step.
    pub per_iteration_secs: f64,
    /// Floating-point operations per optimizer step, all workers combined.
    pub raw_flops: f64,
    /// Per-device throughput, scaled by [`formula::THROUGHPUT_SCALE`].
    pub tflops_per_device: f64,
}

impl ThroughputEstimate {
    /// Derive the estimate for a window that took `total_time`.
    pub fn compute(
        config: &EstimatorConfig,
        num_parameters_billion: f64,
        total_time: Duration,
        num_devices: usize,
    ) -> Result<Self> {
        let num_steps = config.num_steps();
        if num_steps == 0 {
            return Err(FlopsError::EmptyWindow {
                start_idx: config.start_idx,
                end_idx: config.end_idx,
            });
        }
        if num_devices == 0 {
            return Err(FlopsError::NoDevices);
        }
        if total_time.is_zero() {
            return Err(FlopsError::ZeroElapsed { num_steps });
        }

        let total_time_secs = total_time.as_secs_f64();
        let per_iteration_secs = total_time_secs / num_steps as f64;
        let raw_flops = formula::flops_per_iteration(
            num_parameters_billion,
            config.factor(),
            config.model.block_size,
            config.global_batch_size,
        );
        let tflops_per_device =
            formula::per_device_throughput(raw_flops, per_iteration_secs, num_devices);

        Ok(Self {
            num_steps,
            num_devices,
            total_time_secs,
            per_iteration_secs,
            raw_flops,
            tflops_per_device,
        })
    }

    /// Serialize to a single-line JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
