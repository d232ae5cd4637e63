//! Integration tests for the fixed-rate tick driver.
//!
//! Uses paused Tokio time: `sleep_until` resolves as soon as the runtime
//! has nothing else to do, so the tests are deterministic.

use std::time::Duration;

use arenaflow_tick::{TickConfig, TickScheduler};

fn no_jitter(rate: u32) -> TickConfig {
    TickConfig {
        initial_jitter_us: 0,
        ..TickConfig::with_rate(rate)
    }
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_game_tick_rate() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.tick_rate_hz, 20);
    assert_eq!(cfg.tick_duration(), Duration::from_millis(50));
}

#[test]
fn test_validated_clamps_rate() {
    assert_eq!(TickConfig::with_rate(0).validated().tick_rate_hz, 1);
    assert_eq!(
        TickConfig::with_rate(1000).validated().tick_rate_hz,
        TickConfig::MAX_TICK_RATE_HZ
    );
}

#[test]
fn test_validated_clamps_threshold() {
    let cfg = TickConfig {
        budget_warn_threshold: 3.0,
        ..TickConfig::default()
    }
    .validated();
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

// =========================================================================
// Ticking
// =========================================================================

#[test]
fn test_initial_state() {
    let s = TickScheduler::new(no_jitter(20));
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.tick_rate_hz(), 20);
    assert_eq!(s.tick_duration(), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_monotonically() {
    let mut s = TickScheduler::new(no_jitter(20));
    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert!(!info.overrun);
    }
    assert_eq!(s.metrics().total_ticks, 5);
}

#[tokio::test(start_paused = true)]
async fn test_twenty_ticks_take_one_second() {
    let mut s = TickScheduler::new(no_jitter(20));
    let start = tokio::time::Instant::now();
    for _ in 0..20 {
        s.wait_for_tick().await;
        s.record_tick_end();
    }
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(1020), "took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_late_wake_reports_dropped_ticks() {
    let mut s = TickScheduler::new(no_jitter(10));
    s.wait_for_tick().await;

    // Stall for 3.5 ticks worth of time.
    tokio::time::advance(Duration::from_millis(350)).await;

    let info = s.wait_for_tick().await;
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 2);
    assert_eq!(s.metrics().total_overruns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_on_time_wake_skips_nothing() {
    let mut s = TickScheduler::new(no_jitter(10));
    s.wait_for_tick().await;
    let info = s.wait_for_tick().await;
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(s.metrics().total_skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_wait_does_not_count() {
    let mut s = TickScheduler::new(no_jitter(20));

    // Gives up halfway through the first tick, like a select! branch losing.
    let result = tokio::time::timeout(Duration::from_millis(25), s.wait_for_tick()).await;
    assert!(result.is_err());
    assert_eq!(s.tick_count(), 0);

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert!(!info.overrun);
}
