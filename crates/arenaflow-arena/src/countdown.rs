//! Pre-game countdown timer.
//!
//! Pure counter logic: the arena owns the scheduling and the notices, this
//! type only tracks how much time is left and whether a task drives it.

use arenaflow_tick::TaskId;

/// Remaining seconds a full arena is allowed to wait.
pub const RUSH_START_SECS: i64 = 10;

/// Countdown state for one arena.
///
/// `time_left` is signed: it is decremented after the expiry check, so the
/// tick that sees 0 starts the game and leaves -1 behind.
#[derive(Debug, Clone)]
pub struct Countdown {
    length: i64,
    time_left: i64,
    task: Option<TaskId>,
}

impl Countdown {
    pub fn new(length_secs: u32) -> Self {
        let length = i64::from(length_secs);
        Self {
            length,
            time_left: length,
            task: None,
        }
    }

    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn time_left(&self) -> i64 {
        self.time_left
    }

    /// The task ticking this countdown, if it is running.
    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// `true` once the counter has reached zero.
    pub fn is_expired(&self) -> bool {
        self.time_left <= 0
    }

    /// Arms the countdown with the task that will tick it and restores the
    /// full length.
    pub(crate) fn start(&mut self, task: TaskId) {
        self.time_left = self.length;
        self.task = Some(task);
    }

    /// Disarms the countdown, returning the task to cancel.
    pub(crate) fn stop(&mut self) -> Option<TaskId> {
        self.task.take()
    }

    /// Puts the full length back without touching the task.
    pub(crate) fn rewind(&mut self) {
        self.time_left = self.length;
    }

    pub(crate) fn decrement(&mut self) {
        self.time_left -= 1;
    }

    /// Lowers the remaining time to at most `max_secs`.
    pub(crate) fn clamp_to(&mut self, max_secs: i64) {
        if self.time_left > max_secs {
            self.time_left = max_secs;
        }
    }

    /// Chat announcements go out every ten seconds and then every second
    /// for the last ten.
    pub fn should_announce(seconds_left: i64) -> bool {
        seconds_left < 10 || seconds_left % 10 == 0
    }

    /// Share of the countdown still remaining, in `0.0..=100.0`.
    pub fn percent(&self, seconds_left: i64) -> f32 {
        if self.length <= 0 {
            return 0.0;
        }
        (seconds_left.max(0) as f32 * 100.0 / self.length as f32).min(100.0)
    }
}
