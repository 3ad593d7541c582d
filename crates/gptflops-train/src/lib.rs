//! # gptflops training hooks
//!
//! Measures achieved throughput of a GPT-style training run from inside the
//! host's training loop.
//!
//! ## Architecture Overview
//!
//! - **Estimator**: times the steps between two batch indices on the
//!   coordinating worker and converts them to per-device TFLOPs
//! - **Callbacks**: `TrainerCallback` hooks plus a `CallbackManager` for hosts
//!   that dispatch to several callbacks
//! - **Reporting**: pluggable `Reporter` sinks (tracing, stdout, in-memory) and a
//!   `ChannelReporter` that keeps window reports on a separate sink
//! - **Clocks**: system clock for real runs, manual clock for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gptflops_core::{EstimatorConfig, ModelConfig};
//! use gptflops_train::{CallbackManager, StepContext, ThroughputEstimator};
//!
//! gptflops_train::logging::init_console_logging();
//!
//! let config = EstimatorConfig::new(512, ModelConfig::gpt2_xl())
//!     .with_activation_checkpointing(true);
//! let mut callbacks = CallbackManager::new();
//! callbacks.add(ThroughputEstimator::new(config));
//!
//! for batch_idx in 0..100 {
//!     let ctx = StepContext::rank_zero(batch_idx, 8);
//!     callbacks.on_train_batch_start(&ctx);
//!     // forward, backward, optimizer step
//!     callbacks.on_train_batch_end(&ctx);
//! }
//! ```

pub mod callback;
pub mod clock;
pub mod estimator;
pub mod logging;
pub mod report;

pub use callback::{CallbackManager, StepContext, TrainerCallback};
pub use clock::{Clock, ManualClock, SystemClock};
pub use estimator::{ThroughputEstimator, WindowState};
pub use report::{
    ChannelReporter, MemoryReporter, Report, Reporter, StdoutReporter, TracingReporter,
};
