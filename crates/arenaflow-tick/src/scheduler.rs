//! Fixed-rate tick driver.
//!
//! Paces the host's main loop in real time. The driver only decides *when*
//! a game tick happens; what happens on a tick is up to the caller (usually
//! [`TaskTimer::advance`](crate::TaskTimer::advance)).
//!
//! A driver that wakes up late does not try to catch up. Missed ticks are
//! dropped and counted, so countdowns and vote timeouts run long by that
//! many ticks instead of firing in a burst.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

use crate::TICKS_PER_SECOND;

/// Settings for a [`TickScheduler`]. Built in code by the host, never read
/// from a config file.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Game ticks per second, `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Share of a tick (0.0 to 1.0) the host's tick body may use before it
    /// is logged as slow.
    pub budget_warn_threshold: f64,
    /// Upper bound of a random offset for the first tick, in microseconds.
    /// Arenas created in the same instant then tick at different moments.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICKS_PER_SECOND as u32,
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Brings the rate and threshold into range, warning on a rate change.
    pub fn validated(self) -> Self {
        let tick_rate_hz = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if tick_rate_hz != self.tick_rate_hz {
            warn!(
                requested = self.tick_rate_hz,
                used = tick_rate_hz,
                "arena tick rate out of range"
            );
        }
        Self {
            tick_rate_hz,
            budget_warn_threshold: self.budget_warn_threshold.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Real time between two game ticks.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz.max(1)
    }
}

/// What [`TickScheduler::wait_for_tick`] reports about the tick it waited for.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Game tick number, the first one is 1.
    pub tick: u64,
    /// Woke up more than a tenth of a tick late.
    pub overrun: bool,
    /// Whole ticks dropped because of the late wake-up.
    pub ticks_skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest tick body measured between `wait_for_tick` and
    /// `record_tick_end`.
    pub max_tick_time: Duration,
}

/// Real-time pacing for one arena host.
pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    ticks: u64,
    next_due: TokioInstant,
    body_started: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();
        let offset = match config.initial_jitter_us {
            0 => Duration::ZERO,
            max => Duration::from_micros(rand::rng().random_range(0..max)),
        };
        debug!(rate_hz = config.tick_rate_hz, ?offset, "tick driver created");

        Self {
            next_due: TokioInstant::now() + period + offset,
            config,
            period,
            ticks: 0,
            body_started: None,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel safe: nothing changes until the sleep has finished, so it can
    /// sit in a `tokio::select!` next to the host's command channel.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        time::sleep_until(self.next_due).await;

        let woke = TokioInstant::now();
        let late_by = woke.saturating_duration_since(self.next_due);
        let overrun = late_by > self.period / 10;
        let ticks_skipped = (late_by.as_nanos() / self.period.as_nanos()) as u64;

        self.ticks += 1;
        self.body_started = Some(Instant::now());
        self.next_due = woke + self.period;

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }
        if ticks_skipped > 0 {
            warn!(
                tick = self.ticks,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "arena host fell behind, dropping ticks"
            );
        } else {
            trace!(tick = self.ticks, overrun, "tick");
        }

        TickInfo {
            tick: self.ticks,
            overrun,
            ticks_skipped,
        }
    }

    /// Ends the tick body started by the last `wait_for_tick` and checks it
    /// against the budget.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.body_started.take() else {
            return;
        };
        let took = started.elapsed();
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(took);

        let used = took.as_secs_f64() / self.period.as_secs_f64();
        if used >= self.config.budget_warn_threshold {
            warn!(
                tick = self.ticks,
                took_ms = took.as_secs_f64() * 1000.0,
                budget_used = format!("{:.0}%", used * 100.0),
                "slow arena tick"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
