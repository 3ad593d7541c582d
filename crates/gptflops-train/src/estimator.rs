//! Achieved-throughput estimate for GPT-style training runs.
//!
//! Wraps the lower-bound FLOPs estimate from the Megatron-LM paper
//! (arXiv:2104.04473) and the BigScience TFLOPs notes. The parameter count is
//! derived once from the architecture; the estimator then times the steps
//! between `start_idx` and `end_idx` on the coordinating worker and reports
//! the resulting per-device throughput.
//!
//! # Example
//!
//! ```rust
//! use gptflops_core::{EstimatorConfig, ModelConfig};
//! use gptflops_train::{ManualClock, MemoryReporter, ThroughputEstimator};
//! use std::time::Duration;
//!
//! let config = EstimatorConfig::new(8, ModelConfig::gpt2_small()).with_window(2, 4);
//! let clock = ManualClock::new();
//! let reporter = MemoryReporter::new();
//! let mut est = ThroughputEstimator::with_parts(config, reporter.clone(), clock.clone());
//!
//! est.on_batch_start(true, 2);
//! clock.advance(Duration::from_secs(2));
//! let estimate = est.on_batch_end(true, 4, 1).unwrap();
//! assert_eq!(estimate.per_iteration_secs, 1.0);
//! ```

use std::time::Instant;

use gptflops_core::{formula, EstimatorConfig, FlopsError, Result, ThroughputEstimate};

use crate::callback::{StepContext, TrainerCallback};
use crate::clock::{Clock, SystemClock};
use crate::logging::{
    log_event_ignored, log_observation_failure, log_window_close, log_window_open,
};
use crate::report::{Report, Reporter, TracingReporter};

/// Progress of the measurement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowState {
    /// Waiting for `start_idx`.
    Idle,
    /// Started at `start`, waiting for `end_idx`.
    Timing { start: Instant },
    /// Window completed with this estimate.
    Reported(ThroughputEstimate),
}

/// Training callback that estimates achieved TFLOPs over a window of steps.
pub struct ThroughputEstimator<R = TracingReporter, C = SystemClock> {
    config: EstimatorConfig,
    num_parameters: f64,
    state: WindowState,
    reporter: R,
    clock: C,
}

impl ThroughputEstimator {
    /// Estimator that reports through `tracing` and reads the system clock.
    pub fn new(config: EstimatorConfig) -> Self {
        Self::with_parts(config, TracingReporter, SystemClock)
    }
}

impl<R: Reporter, C: Clock> ThroughputEstimator<R, C> {
    /// Estimator with an explicit reporter and clock.
    ///
    /// Reports the parameter count immediately, on every worker.
    pub fn with_parts(config: EstimatorConfig, mut reporter: R, clock: C) -> Self {
        let num_parameters = config.model.num_parameters_billion();
        reporter.report(&Report::ParameterCount {
            billions: num_parameters,
        });

        Self {
            config,
            num_parameters,
            state: WindowState::Idle,
            reporter,
            clock,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Parameter count in billions, fixed at construction.
    pub fn num_parameters_billion(&self) -> f64 {
        self.num_parameters
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    /// Most recent completed estimate, if any.
    pub fn last_estimate(&self) -> Option<&ThroughputEstimate> {
        match &self.state {
            WindowState::Reported(est) => Some(est),
            _ => None,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Batch-start hook. Opens the window on the coordinating worker at
    /// `start_idx`; a repeat firing restarts the timer.
    pub fn on_batch_start(&mut self, is_global_zero: bool, batch_idx: usize) {
        if !is_global_zero || batch_idx != self.config.start_idx {
            log_event_ignored("on_batch_start", batch_idx, is_global_zero);
            return;
        }

        let rearmed = !matches!(self.state, WindowState::Idle);
        self.state = WindowState::Timing {
            start: self.clock.now(),
        };
        log_window_open(batch_idx, self.config.end_idx, rearmed);
    }

    /// Batch-end hook. Closes the window on the coordinating worker at
    /// `end_idx` and reports the estimate.
    ///
    /// Failures (no open window, empty window, zero devices) are logged and
    /// swallowed so the training loop keeps running.
    pub fn on_batch_end(
        &mut self,
        is_global_zero: bool,
        batch_idx: usize,
        num_devices: usize,
    ) -> Option<ThroughputEstimate> {
        if !is_global_zero || batch_idx != self.config.end_idx {
            log_event_ignored("on_batch_end", batch_idx, is_global_zero);
            return None;
        }

        match self.finish(num_devices) {
            Ok(estimate) => Some(estimate),
            Err(err) => {
                log_observation_failure(batch_idx, &err);
                None
            }
        }
    }

    fn finish(&mut self, num_devices: usize) -> Result<ThroughputEstimate> {
        let WindowState::Timing { start } = self.state else {
            return Err(FlopsError::WindowNotStarted {
                end_idx: self.config.end_idx,
            });
        };
        self.state = WindowState::Idle;

        let total_time = self.clock.now().saturating_duration_since(start);
        log_window_close(self.config.end_idx, total_time.as_secs_f64());

        if self.config.num_steps() == 0 {
            return Err(FlopsError::EmptyWindow {
                start_idx: self.config.start_idx,
                end_idx: self.config.end_idx,
            });
        }

        // Raw FLOPs go out before the per-device division, which can still fail.
        self.reporter.report(&Report::RawFlops {
            flops: formula::flops_per_iteration(
                self.num_parameters,
                self.config.factor(),
                self.config.model.block_size,
                self.config.global_batch_size,
            ),
        });

        let estimate =
            ThroughputEstimate::compute(&self.config, self.num_parameters, total_time, num_devices)?;
        self.reporter.report(&Report::Throughput(estimate));
        self.state = WindowState::Reported(estimate);
        Ok(estimate)
    }
}

impl<R: Reporter, C: Clock> TrainerCallback for ThroughputEstimator<R, C> {
    fn on_train_batch_start(&mut self, ctx: &StepContext) {
        self.on_batch_start(ctx.is_global_zero, ctx.batch_idx);
    }

    fn on_train_batch_end(&mut self, ctx: &StepContext) {
        self.on_batch_end(ctx.is_global_zero, ctx.batch_idx, ctx.num_devices);
    }

    fn name(&self) -> &'static str {
        "ThroughputEstimator"
    }
}
