//! Report sinks for the estimator.
//!
//! The estimator never prints directly. It hands each [`Report`] to a
//! [`Reporter`], so the host decides whether it ends up in tracing, on stdout,
//! or in a buffer.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use gptflops_core::ThroughputEstimate;

/// One message emitted by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    /// Model size, emitted once at construction on every worker.
    ParameterCount { billions: f64 },
    /// FLOPs of one optimizer step, emitted by the coordinating worker.
    RawFlops { flops: f64 },
    /// Final window estimate, emitted by the coordinating worker.
    Throughput(ThroughputEstimate),
}

impl Report {
    /// Whether only the coordinating worker may emit this report.
    pub fn is_rank_zero_only(&self) -> bool {
        !matches!(self, Report::ParameterCount { .. })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::ParameterCount { billions } => {
                write!(f, "Number of parameters: {billions:.2} Billion")
            }
            Report::RawFlops { flops } => write!(f, "FLOPS {flops}"),
            Report::Throughput(est) => write!(
                f,
                "Estimates: {:.2}TFLOPs Avg Iteration Time: {:.2}s",
                est.tflops_per_device, est.per_iteration_secs
            ),
        }
    }
}

/// Destination for estimator reports.
pub trait Reporter: Send {
    /// Deliver one report.
    fn report(&mut self, report: &Report);
}

/// Emits reports as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, report: &Report) {
        match report {
            Report::ParameterCount { billions } => {
                tracing::info!(
                    num_parameters_billion = billions,
                    event = "parameter_count",
                    "{report}"
                );
            }
            Report::RawFlops { flops } => {
                tracing::info!(raw_flops = flops, event = "raw_flops", "{report}");
            }
            Report::Throughput(est) => {
                tracing::info!(
                    tflops_per_device = est.tflops_per_device,
                    per_iteration_secs = est.per_iteration_secs,
                    num_steps = est.num_steps,
                    num_devices = est.num_devices,
                    event = "throughput_estimate",
                    "{report}"
                );
            }
        }
    }
}

/// Prints one line per report to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&mut self, report: &Report) {
        println!("{report}");
    }
}

/// Routes reports to an unrestricted sink and a coordinating-worker sink.
///
/// Reports for which [`Report::is_rank_zero_only`] holds go to `rank_zero`;
/// everything else goes to `unrestricted`.
#[derive(Debug, Clone, Default)]
pub struct ChannelReporter<U, Z> {
    unrestricted: U,
    rank_zero: Z,
}

impl<U: Reporter, Z: Reporter> ChannelReporter<U, Z> {
    pub fn new(unrestricted: U, rank_zero: Z) -> Self {
        Self {
            unrestricted,
            rank_zero,
        }
    }

    pub fn unrestricted(&self) -> &U {
        &self.unrestricted
    }

    pub fn rank_zero(&self) -> &Z {
        &self.rank_zero
    }
}

impl<U: Reporter, Z: Reporter> Reporter for ChannelReporter<U, Z> {
    fn report(&mut self, report: &Report) {
        if report.is_rank_zero_only() {
            self.rank_zero.report(report);
        } else {
            self.unrestricted.report(report);
        }
    }
}

/// Collects reports in a shared buffer.
///
/// Clones share the buffer; keep one handle to read what the estimator wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered text of everything reported so far.
    pub fn lines(&self) -> Vec<String> {
        self.reports().iter().map(ToString::to_string).collect()
    }

    /// Throughput estimates reported so far.
    pub fn estimates(&self) -> Vec<ThroughputEstimate> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Throughput(est) => Some(est),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, report: &Report) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*report);
    }
}
