//! Repeating tasks measured in game ticks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

/// Game ticks per wall-clock second.
pub const TICKS_PER_SECOND: u64 = 20;

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

/// Handle to a scheduled task.
///
/// Ids are never reused, so a stale handle can't cancel somebody else's
/// task. "Not running" is expressed as `Option<TaskId>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// The raw id (starts at 1).
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Periodic task scheduling, as seen by arena components.
///
/// Components hold an `Arc<dyn Scheduler>`; the host owns the concrete
/// timer and routes due task ids back to the components.
pub trait Scheduler: Send + Sync {
    /// Schedules a task that first runs `initial_delay_ticks` ticks from
    /// now (0 = on the next tick processed) and then every `period_ticks`.
    fn schedule_repeating(&self, initial_delay_ticks: u64, period_ticks: u64) -> TaskId;

    /// Cancels a task. Cancelling an unknown or finished task is a no-op.
    fn cancel(&self, task: TaskId);

    /// The game tick currently being (or about to be) processed.
    fn now(&self) -> u64;
}

// ---------------------------------------------------------------------------
// TaskTimer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Task {
    next_due: u64,
    period: u64,
}

#[derive(Debug, Default)]
struct TimerState {
    now: u64,
    last_id: u64,
    tasks: BTreeMap<TaskId, Task>,
}

/// Deterministic [`Scheduler`] driven one tick at a time.
///
/// Due tasks are reported in scheduling order. The timer itself is cheap to
/// share (`Arc<TaskTimer>` coerces to `Arc<dyn Scheduler>`); the lock is
/// only held inside each method, never while a task runs.
#[derive(Debug, Default)]
pub struct TaskTimer {
    state: Mutex<TimerState>,
}

impl TaskTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        // A panic elsewhere can't leave the task table half-updated, so a
        // poisoned lock is still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Processes one game tick: returns every task due at the current tick
    /// and moves the clock forward by one.
    pub fn advance(&self) -> Vec<TaskId> {
        let mut state = self.lock();
        let now = state.now;
        let mut due = Vec::new();
        for (id, task) in state.tasks.iter_mut() {
            if task.next_due <= now {
                due.push(*id);
                task.next_due = now + task.period;
            }
        }
        state.now += 1;
        if !due.is_empty() {
            trace!(tick = now, due = due.len(), "tasks due");
        }
        due
    }

    /// Whether `task` is still scheduled.
    pub fn is_scheduled(&self, task: TaskId) -> bool {
        self.lock().tasks.contains_key(&task)
    }

    /// Number of scheduled tasks.
    pub fn active_tasks(&self) -> usize {
        self.lock().tasks.len()
    }
}

impl Scheduler for TaskTimer {
    fn schedule_repeating(&self, initial_delay_ticks: u64, period_ticks: u64) -> TaskId {
        let period = if period_ticks == 0 {
            warn!("repeating task with a zero period, running it every tick");
            1
        } else {
            period_ticks
        };

        let mut state = self.lock();
        state.last_id += 1;
        let id = TaskId(state.last_id);
        let next_due = state.now + initial_delay_ticks;
        state.tasks.insert(id, Task { next_due, period });
        trace!(task = %id, next_due, period, "task scheduled");
        id
    }

    fn cancel(&self, task: TaskId) {
        if self.lock().tasks.remove(&task).is_some() {
            trace!(%task, "task cancelled");
        }
    }

    fn now(&self) -> u64 {
        self.lock().now
    }
}
