//! Integration tests for throughput estimation inside a simulated run
//!
//! These tests drive the estimator the way a host training loop would:
//! - Multiple workers, one coordinating
//! - Dispatch through the callback manager
//! - Batch indices that reset every epoch
//! - Config loaded from TOML

use std::time::Duration;

use anyhow::Result;
use gptflops_core::{EstimatorConfig, ModelConfig, ThroughputEstimate};
use gptflops_train::{
    CallbackManager, ChannelReporter, ManualClock, MemoryReporter, Report, StepContext,
    ThroughputEstimator,
};
use proptest::prelude::*;

const STEP_TIME: Duration = Duration::from_millis(250);

struct Worker {
    is_global_zero: bool,
    callbacks: CallbackManager,
    reporter: MemoryReporter,
}

/// One estimator per worker, all reading the same simulated clock.
fn spawn_workers(config: &EstimatorConfig, n: usize, clock: &ManualClock) -> Vec<Worker> {
    (0..n)
        .map(|rank| {
            let reporter = MemoryReporter::new();
            let mut callbacks = CallbackManager::new();
            callbacks.add(ThroughputEstimator::with_parts(
                config.clone(),
                reporter.clone(),
                clock.clone(),
            ));
            Worker {
                is_global_zero: rank == 0,
                callbacks,
                reporter,
            }
        })
        .collect()
}

fn run_epochs(workers: &mut [Worker], clock: &ManualClock, epochs: usize, steps: usize) {
    let num_devices = workers.len();
    for _ in 0..epochs {
        for batch_idx in 0..steps {
            for w in workers.iter_mut() {
                let ctx = StepContext {
                    batch_idx,
                    is_global_zero: w.is_global_zero,
                    num_devices,
                };
                w.callbacks.on_train_batch_start(&ctx);
            }
            clock.advance(STEP_TIME);
            for w in workers.iter_mut() {
                let ctx = StepContext {
                    batch_idx,
                    is_global_zero: w.is_global_zero,
                    num_devices,
                };
                w.callbacks.on_train_batch_end(&ctx);
            }
        }
    }
}

#[test]
fn test_only_rank_zero_reports_window() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small());
    let clock = ManualClock::new();
    let mut workers = spawn_workers(&config, 4, &clock);

    run_epochs(&mut workers, &clock, 1, 50);

    for (rank, w) in workers.iter().enumerate() {
        let reports = w.reporter.reports();
        // Every worker prints the parameter count.
        assert!(matches!(reports[0], Report::ParameterCount { .. }));
        if rank == 0 {
            assert_eq!(reports.len(), 3);
            assert!(matches!(reports[1], Report::RawFlops { .. }));
        } else {
            assert_eq!(reports.len(), 1, "rank {rank} reported a window");
        }
    }
}

#[test]
fn test_channel_reporter_separates_window_reports() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small());
    let clock = ManualClock::new();
    let console = MemoryReporter::new();
    let rank_zero = MemoryReporter::new();
    let mut callbacks = CallbackManager::new();
    callbacks.add(ThroughputEstimator::with_parts(
        config,
        ChannelReporter::new(console.clone(), rank_zero.clone()),
        clock.clone(),
    ));

    for batch_idx in 0..50 {
        let ctx = StepContext::rank_zero(batch_idx, 1);
        callbacks.on_train_batch_start(&ctx);
        clock.advance(STEP_TIME);
        callbacks.on_train_batch_end(&ctx);
    }

    assert_eq!(console.lines(), vec!["Number of parameters: 0.12 Billion"]);
    let window = rank_zero.reports();
    assert_eq!(window.len(), 2);
    assert!(window.iter().all(Report::is_rank_zero_only));
}

#[test]
fn test_window_timing_matches_simulated_steps() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small());
    let clock = ManualClock::new();
    let mut workers = spawn_workers(&config, 2, &clock);

    run_epochs(&mut workers, &clock, 1, 50);

    let estimates = workers[0].reporter.estimates();
    assert_eq!(estimates.len(), 1);
    let est = estimates[0];
    // Timer opens before step 20 and closes after step 40: 21 step durations.
    assert!((est.total_time_secs - 21.0 * STEP_TIME.as_secs_f64()).abs() < 1e-9);
    assert!((est.per_iteration_secs - est.total_time_secs / 20.0).abs() < 1e-12);
    assert_eq!(est.num_devices, 2);
}

#[test]
fn test_run_shorter_than_window_never_reports() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small());
    let clock = ManualClock::new();
    let mut workers = spawn_workers(&config, 1, &clock);

    run_epochs(&mut workers, &clock, 3, 30);

    assert!(workers[0].reporter.estimates().is_empty());
}

#[test]
fn test_each_epoch_remeasures() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small()).with_window(2, 6);
    let clock = ManualClock::new();
    let mut workers = spawn_workers(&config, 1, &clock);

    run_epochs(&mut workers, &clock, 3, 10);

    let estimates = workers[0].reporter.estimates();
    assert_eq!(estimates.len(), 3);
    assert!(estimates.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_inverted_window_is_silent() {
    let config = EstimatorConfig::new(64, ModelConfig::gpt2_small()).with_window(40, 20);
    let clock = ManualClock::new();
    let mut workers = spawn_workers(&config, 1, &clock);

    run_epochs(&mut workers, &clock, 1, 60);

    assert!(workers[0].reporter.estimates().is_empty());
}

#[test]
fn test_config_from_toml_drives_estimator() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("estimator.toml");
    std::fs::write(
        &path,
        r#"
global_batch_size = 8
activation_checkpointing = true
start_idx = 1
end_idx = 3

[model]
hidden_size = 768
n_layer = 12
block_size = 1024
vocab_size = 50257
"#,
    )?;

    let config = EstimatorConfig::from_file(&path)?;

    let clock = ManualClock::new();
    let reporter = MemoryReporter::new();
    let mut est = ThroughputEstimator::with_parts(config, reporter.clone(), clock.clone());
    est.on_batch_start(true, 1);
    clock.advance(Duration::from_secs(4));
    let estimate = est
        .on_batch_end(true, 3, 1)
        .ok_or_else(|| anyhow::anyhow!("window did not report"))?;

    assert_eq!(estimate.per_iteration_secs, 2.0);
    let expected_raw = 0.124439808 * 1e9 * 4.0 * 2.0 * 1024.0 * 8.0;
    assert!((estimate.raw_flops / expected_raw - 1.0).abs() < 1e-12);
    Ok(())
}

fn measure(config: &EstimatorConfig, secs: u64, devices: usize) -> Option<ThroughputEstimate> {
    let clock = ManualClock::new();
    let mut est =
        ThroughputEstimator::with_parts(config.clone(), MemoryReporter::new(), clock.clone());
    est.on_batch_start(true, config.start_idx);
    clock.advance(Duration::from_secs(secs));
    est.on_batch_end(true, config.end_idx, devices)
}

proptest! {
    /// Identical config and timing give identical output.
    #[test]
    fn estimates_are_deterministic(
        batch in 1usize..2048,
        secs in 1u64..10_000,
        devices in 1usize..256,
        ckpt in any::<bool>(),
    ) {
        let config = EstimatorConfig::new(batch, ModelConfig::gpt2_medium())
            .with_activation_checkpointing(ckpt);
        prop_assert_eq!(measure(&config, secs, devices), measure(&config, secs, devices));
    }

    /// Non-coordinating workers stay silent whatever indices they see.
    #[test]
    fn non_zero_ranks_never_report(steps in proptest::collection::vec(0usize..64, 1..200)) {
        let config = EstimatorConfig::new(8, ModelConfig::gpt2_small());
        let clock = ManualClock::new();
        let reporter = MemoryReporter::new();
        let mut est = ThroughputEstimator::with_parts(config, reporter.clone(), clock.clone());
        for step in steps {
            est.on_batch_start(false, step);
            clock.advance(STEP_TIME);
            prop_assert!(est.on_batch_end(false, step, 4).is_none());
        }
        prop_assert_eq!(reporter.reports().len(), 1);
    }
}
