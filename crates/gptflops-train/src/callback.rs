//! Step-boundary hooks fired by a host training loop.
//!
//! The host owns the loop and distributed setup; callbacks only see the
//! per-step [`StepContext`] it hands them.

/// State passed to callbacks at each batch boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepContext {
    /// Index of the batch within the current epoch (0-based).
    pub batch_idx: usize,
    /// True on exactly one worker across the distributed run.
    pub is_global_zero: bool,
    /// Number of devices participating in the run.
    pub num_devices: usize,
}

impl StepContext {
    /// Context as seen by the coordinating worker.
    pub fn rank_zero(batch_idx: usize, num_devices: usize) -> Self {
        Self {
            batch_idx,
            is_global_zero: true,
            num_devices,
        }
    }

    /// Context as seen by any other worker.
    pub fn worker(batch_idx: usize, num_devices: usize) -> Self {
        Self {
            batch_idx,
            is_global_zero: false,
            num_devices,
        }
    }
}

/// Trait for training callbacks.
///
/// All methods have default no-op implementations, so you only need to
/// implement the events you care about.
pub trait TrainerCallback: Send {
    /// Called before each training batch.
    fn on_train_batch_start(&mut self, _ctx: &StepContext) {}

    /// Called after each training batch.
    fn on_train_batch_end(&mut self, _ctx: &StepContext) {}

    /// Get callback name for logging.
    fn name(&self) -> &'static str {
        "TrainerCallback"
    }
}

/// Manages multiple callbacks and dispatches events in registration order.
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    /// Create new callback manager.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a callback.
    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        tracing::debug!(callback = callback.name(), "Registered training callback");
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Get number of callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Fire batch start event.
    pub fn on_train_batch_start(&mut self, ctx: &StepContext) {
        for cb in &mut self.callbacks {
            cb.on_train_batch_start(ctx);
        }
    }

    /// Fire batch end event.
    pub fn on_train_batch_end(&mut self, ctx: &StepContext) {
        for cb in &mut self.callbacks {
            cb.on_train_batch_end(ctx);
        }
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}
