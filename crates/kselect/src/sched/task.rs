// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Task handle: wake-reason slot, one-shot timer state and the condvar the
//! task parks on.
//!
//! All of a task's shared state lives behind one short `parking_lot` lock.
//! The lock is released by `Condvar::wait` while the task is parked, so it is
//! never held across the suspension point.

use super::{Ticks, WokenBy};
use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a task (unique per process).
pub type TaskId = u64;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<Task>> = const { RefCell::new(None) };
}

/// Shared handle to a task.
///
/// Every thread that enters the engine is a task; [`Task::current`] creates
/// the handle on first use.
#[derive(Clone)]
pub struct Task {
    pub(super) inner: Arc<TaskInner>,
}

pub(super) struct TaskInner {
    id: TaskId,
    state: Mutex<TaskState>,
    wakeup: Condvar,
}

/// One arming of the task's wakeup timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ArmedTimer {
    pub(super) deadline: Ticks,
    pub(super) seq: u64,
}

#[derive(Default)]
struct TaskState {
    reason: Option<WokenBy>,
    blocked: bool,
    timer: Option<ArmedTimer>,
}

impl Task {
    fn new() -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(TaskState::default()),
                wakeup: Condvar::new(),
            }),
        }
    }

    /// The task bound to the calling thread.
    pub fn current() -> Task {
        CURRENT.with(|slot| slot.borrow_mut().get_or_insert_with(Task::new).clone())
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Whether the task is currently parked in `block_until_woken`.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.inner.state.lock().blocked
    }

    /// Whether the task has a wakeup timer pending.
    #[must_use]
    pub fn has_timer(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Deliver a wake reason.
    ///
    /// A pending `Timeout` is never downgraded to `Condition`; a pending
    /// `Condition` is upgraded to `Timeout`. Returns `false` when the wake was
    /// absorbed by a reason already pending.
    pub(crate) fn wake(&self, reason: WokenBy) -> bool {
        let mut state = self.inner.state.lock();
        match (state.reason, reason) {
            (Some(WokenBy::Timeout), _) | (Some(WokenBy::Condition), WokenBy::Condition) => {
                return false;
            }
            _ => state.reason = Some(reason),
        }
        self.inner.wakeup.notify_one();
        true
    }

    /// Drop any wake reason left over from an earlier wait.
    pub(crate) fn reset_wake_reason(&self) {
        self.inner.state.lock().reason = None;
    }

    /// Park until a wake reason is pending, then take and clear it.
    pub(super) fn park(&self) -> WokenBy {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(reason) = state.reason.take() {
                state.blocked = false;
                return reason;
            }
            state.blocked = true;
            self.inner.wakeup.wait(&mut state);
        }
    }

    /// Record a new arming, returning the one it replaces.
    pub(super) fn set_timer(&self, timer: ArmedTimer) -> Option<ArmedTimer> {
        self.inner.state.lock().timer.replace(timer)
    }

    /// Disarm the timer. A `Timeout` reason left by a timer that fired just
    /// before the disarm is discarded with it.
    pub(super) fn take_timer(&self) -> Option<ArmedTimer> {
        let mut state = self.inner.state.lock();
        if state.reason == Some(WokenBy::Timeout) {
            state.reason = None;
        }
        state.timer.take()
    }

    /// Timer expiry path. Only the arming identified by `seq` may fire.
    pub(super) fn fire_timer(&self, seq: u64) -> bool {
        let mut state = self.inner.state.lock();
        match state.timer {
            Some(armed) if armed.seq == seq => {
                state.timer = None;
                state.reason = Some(WokenBy::Timeout);
                self.inner.wakeup.notify_one();
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("id", &self.inner.id).finish()
    }
}
