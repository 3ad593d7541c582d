//! Closed-form parameter and FLOPs estimates for GPT-style decoders.
//!
//! Follows the lower-bound estimate from the Megatron-LM paper
//! (arXiv:2104.04473) and the BigScience model-size notes:
//!
//! ```text
//! params = l * (12h^2 + 13h) + v*h + s*h + 2h
//! flops_per_iteration = params * factor * 2 * s * global_batch_size
//! ```
//!
//! where `factor` is 3 (forward + backward) or 4 (forward + backward +
//! activation recompute).

/// Parameters per billion.
pub const BILLION: f64 = 1e9;

/// Floating-point operations per multiply-accumulate.
pub const FLOPS_PER_MAC: f64 = 2.0;

/// Passes per token without activation checkpointing (forward + backward).
pub const FACTOR_DEFAULT: u32 = 3;

/// Passes per token with activation checkpointing (forward recomputed).
pub const FACTOR_CHECKPOINTED: u32 = 4;

/// Divisor applied when normalizing aggregate FLOPs/s to a per-device figure.
pub const THROUGHPUT_SCALE: f64 = 1e3;

/// Exact parameter count of a GPT-style decoder.
///
/// Returns `None` if the count does not fit in 128 bits.
pub fn parameter_count(
    hidden_size: usize,
    n_layer: usize,
    block_size: usize,
    vocab_size: usize,
) -> Option<u128> {
    let h = hidden_size as u128;
    let l = n_layer as u128;
    let s = block_size as u128;
    let v = vocab_size as u128;

    let per_layer = h
        .checked_mul(h)?
        .checked_mul(12)?
        .checked_add(h.checked_mul(13)?)?;
    l.checked_mul(per_layer)?
        .checked_add(v.checked_mul(h)?)?
        .checked_add(s.checked_mul(h)?)?
        .checked_add(h.checked_mul(2)?)
}

/// Parameter count in billions.
///
/// Falls back to `f64` arithmetic when the exact count overflows, so any
/// input yields a finite or infinite number instead of a panic.
pub fn parameters_billion(
    hidden_size: usize,
    n_layer: usize,
    block_size: usize,
    vocab_size: usize,
) -> f64 {
    match parameter_count(hidden_size, n_layer, block_size, vocab_size) {
        Some(count) => count as f64 / BILLION,
        None => {
            let (h, l, s, v) = (
                hidden_size as f64,
                n_layer as f64,
                block_size as f64,
                vocab_size as f64,
            );
            (l * (12.0 * h * h + 13.0 * h) + v * h + s * h + 2.0 * h) / BILLION
        }
    }
}

/// Passes per token per parameter.
pub fn checkpoint_factor(activation_checkpointing: bool) -> u32 {
    if activation_checkpointing {
        FACTOR_CHECKPOINTED
    } else {
        FACTOR_DEFAULT
    }
}

/// Floating-point operations for one optimizer step across all workers.
pub fn flops_per_iteration(
    num_parameters_billion: f64,
    factor: u32,
    block_size: usize,
    global_batch_size: usize,
) -> f64 {
    num_parameters_billion
        * BILLION
        * f64::from(factor)
        * FLOPS_PER_MAC
        * block_size as f64
        * global_batch_size as f64
}

/// Per-device throughput from the FLOPs of one iteration and its duration.
pub fn per_device_throughput(raw_flops: f64, per_iteration_secs: f64, num_devices: usize) -> f64 {
    raw_flops / (per_iteration_secs * num_devices as f64 * THROUGHPUT_SCALE)
}
