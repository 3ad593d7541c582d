//! Structured logging for throughput measurement with tracing.
//!
//! Hosts that already install a subscriber can skip the `init_*` functions;
//! the estimator only emits events.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gptflops_core::FlopsError;

/// Initialize structured logging.
///
/// Reads log level from RUST_LOG environment variable (defaults to "info").
/// Outputs JSON-formatted logs for production monitoring.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gptflops_train=info,gptflops_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Structured logging initialized");
}

/// Initialize simple console logging (for demos/debugging).
pub fn init_console_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gptflops_train=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

/// Log the measurement window opening.
pub fn log_window_open(step: usize, end_idx: usize, rearmed: bool) {
    debug!(
        step = step,
        end_idx = end_idx,
        rearmed = rearmed,
        event = "window_open",
        "Throughput window started"
    );
}

/// Log the measurement window closing.
pub fn log_window_close(step: usize, total_time_secs: f64) {
    debug!(
        step = step,
        total_time_secs = total_time_secs,
        event = "window_close",
        "Throughput window finished"
    );
}

/// Log a hook call that does not touch the measurement window.
pub fn log_event_ignored(hook: &'static str, step: usize, is_global_zero: bool) {
    debug!(
        hook = hook,
        step = step,
        is_global_zero = is_global_zero,
        event = "hook_ignored",
        "Throughput hook ignored"
    );
}

/// Log a failed observation. Never fatal to training.
pub fn log_observation_failure(step: usize, err: &FlopsError) {
    warn!(
        step = step,
        error = %err,
        misuse = err.is_misuse(),
        event = "throughput_estimate_failed",
        "Skipping throughput estimate"
    );
}

/// Run `f` under a debug-level subscriber and return everything it logged.
#[cfg(test)]
pub(crate) fn capture_logs<F: FnOnce()>(f: F) -> String {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buf.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
