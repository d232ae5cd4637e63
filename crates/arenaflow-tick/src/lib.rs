//! Game-tick scheduling for Arenaflow.
//!
//! Two pieces live here:
//!
//! - [`TaskTimer`]: a registry of repeating tasks measured in game ticks.
//!   It implements [`Scheduler`], the interface every arena component is
//!   handed at construction. It never sleeps: each call to
//!   [`TaskTimer::advance`] runs exactly one game tick and returns the ids
//!   of the tasks that are due.
//! - [`TickScheduler`]: a fixed-rate driver (20 Hz by default) that paces
//!   calls to `advance` in real time, with budget monitoring and overrun
//!   handling.
//!
//! # Dispatch
//!
//! Scheduled work is identified by [`TaskId`] rather than by a boxed
//! closure. The component that scheduled a task keeps the id and runs its
//! own callback when the host hands that id back:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = driver.wait_for_tick() => {
//!             for task in timer.advance() {
//!                 arena.run_task(task);
//!             }
//!             driver.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod scheduler;
mod timer;

pub use scheduler::{TickConfig, TickInfo, TickMetrics, TickScheduler};
pub use timer::{Scheduler, TaskId, TaskTimer, TICKS_PER_SECOND};
