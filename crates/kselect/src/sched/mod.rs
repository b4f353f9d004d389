// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Task layer consumed by the select engine.
//!
//! Provides the scheduler primitives the engine is written against: the
//! current task, the single blocking primitive, one-shot wakeup timers with
//! absolute deadlines, and tick accounting. Tasks are host threads; the tick
//! clock is either driven by hand ([`TickMode::Manual`]) or by a ticker
//! thread ([`TickMode::Realtime`]).

mod task;
mod ticker;
mod timer;

pub use task::{Task, TaskId};

use crate::config::{KernelConfig, TickMode};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use task::ArmedTimer;
use ticker::Ticker;
use timer::TimerQueue;

/// Timer ticks since the scheduler started.
pub type Ticks = u64;

/// Why a blocked task resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WokenBy {
    /// A condition the task waits on was signaled.
    Condition,
    /// The task's wakeup timer expired.
    Timeout,
}

/// Tick clock, timer queue and blocking primitive.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedInner>,
}

pub(super) struct SchedInner {
    hz: u32,
    ticks: AtomicU64,
    timers: Mutex<TimerQueue>,
    blocked: AtomicUsize,
    blocks: AtomicU64,
    ticker: Mutex<Option<Ticker>>,
}

impl Scheduler {
    /// Create a manually ticked scheduler running at `hz` ticks per second.
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self {
            inner: Arc::new(SchedInner {
                hz,
                ticks: AtomicU64::new(0),
                timers: Mutex::new(TimerQueue::default()),
                blocked: AtomicUsize::new(0),
                blocks: AtomicU64::new(0),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Create a scheduler from a kernel configuration, starting the ticker
    /// thread in realtime mode.
    pub fn with_config(config: &KernelConfig) -> Result<Self> {
        config.validate()?;
        let sched = Self::new(config.timer_hz);

        if config.tick_mode == TickMode::Realtime {
            let ticker = Ticker::spawn(Arc::downgrade(&sched.inner), config.tick_period())
                .map_err(|e| {
                    log::warn!("[sched] failed to spawn ticker: {}", e);
                    Error::OutOfMemory
                })?;
            *sched.inner.ticker.lock() = Some(ticker);
        }

        Ok(sched)
    }

    /// The task bound to the calling thread.
    #[must_use]
    pub fn current_task(&self) -> Task {
        Task::current()
    }

    #[must_use]
    pub fn timer_hz(&self) -> u32 {
        self.inner.hz
    }

    /// Ticks elapsed since start.
    #[must_use]
    pub fn now(&self) -> Ticks {
        self.inner.ticks.load(Ordering::Acquire)
    }

    /// Advance the clock by one tick and fire expired timers.
    ///
    /// Returns the number of tasks woken.
    pub fn tick(&self) -> usize {
        self.inner.tick()
    }

    /// Tick `n` times.
    pub fn advance(&self, n: Ticks) -> usize {
        (0..n).map(|_| self.inner.tick()).sum()
    }

    /// Park `task` until it is woken, returning why.
    ///
    /// This is the only place a task suspends. Must be called from the thread
    /// that owns `task`.
    pub fn block_until_woken(&self, task: &Task) -> WokenBy {
        debug_assert_eq!(task.id(), Task::current().id(), "blocking a foreign task");

        self.inner.blocks.fetch_add(1, Ordering::Relaxed);
        self.inner.blocked.fetch_add(1, Ordering::AcqRel);
        let reason = task.park();
        self.inner.blocked.fetch_sub(1, Ordering::AcqRel);

        log::trace!("[sched] task {} woken by {:?}", task.id(), reason);
        reason
    }

    /// Schedule a one-shot `Timeout` wake of `task` at `now + ticks`.
    ///
    /// Re-arming replaces the pending timer.
    pub fn arm_timer(&self, task: &Task, ticks: Ticks) {
        let mut timers = self.inner.timers.lock();
        let deadline = self.now().saturating_add(ticks);
        let seq = timers.insert(deadline, task);

        if let Some(old) = task.set_timer(ArmedTimer { deadline, seq }) {
            timers.remove(old.deadline, old.seq);
        }
        log::trace!(
            "[timer] task {} armed for {} ticks (deadline {})",
            task.id(),
            ticks,
            deadline
        );
    }

    /// Disarm the task's timer and return the ticks it had left.
    ///
    /// Returns 0 when the timer already fired or was never armed.
    pub fn cancel_timer(&self, task: &Task) -> Ticks {
        let mut timers = self.inner.timers.lock();
        match task.take_timer() {
            Some(armed) => {
                timers.remove(armed.deadline, armed.seq);
                armed.deadline.saturating_sub(self.now())
            }
            None => 0,
        }
    }

    /// Sleep for exactly `ticks` ticks, ignoring condition wakes.
    pub fn sleep(&self, task: &Task, ticks: Ticks) {
        if ticks == 0 {
            return;
        }

        task.reset_wake_reason();
        self.arm_timer(task, ticks);
        while self.block_until_woken(task) != WokenBy::Timeout {}
    }

    /// Number of tasks currently inside `block_until_woken`.
    #[must_use]
    pub fn blocked_tasks(&self) -> usize {
        self.inner.blocked.load(Ordering::Acquire)
    }

    /// Total number of times any task entered `block_until_woken`.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.inner.blocks.load(Ordering::Relaxed)
    }

    /// Number of armed wakeup timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.lock().len()
    }
}

impl SchedInner {
    fn tick(&self) -> usize {
        let now = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        let expired = self.timers.lock().drain_expired(now);

        let mut woken = 0;
        for (seq, task) in expired {
            if task.fire_timer(seq) {
                log::trace!("[timer] task {} timed out at tick {}", task.id(), now);
                woken += 1;
            }
        }
        woken
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("hz", &self.inner.hz)
            .field("now", &self.now())
            .field("blocked", &self.blocked_tasks())
            .field("next_deadline", &self.inner.timers.lock().next_deadline())
            .finish()
    }
}

#[cfg(test)]
mod tests;
