// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timeout controller for one select call.

use crate::sched::{Scheduler, Task, Ticks};

/// Arms the caller's wakeup timer once and recovers the unused ticks.
///
/// The deadline is absolute (`now + ticks` at arming), so a wait that loops
/// over spurious wakes is still bounded by the requested timeout.
pub(crate) struct TimeoutController {
    sched: Scheduler,
    task: Task,
    requested: Option<u32>,
    remaining: Option<u32>,
    armed: bool,
}

impl TimeoutController {
    pub(crate) fn new(sched: &Scheduler, task: &Task, requested: Option<u32>) -> Self {
        Self {
            sched: sched.clone(),
            task: task.clone(),
            requested,
            remaining: requested,
            armed: false,
        }
    }

    /// A zero timeout: the call polls and never blocks.
    pub(crate) fn is_poll(&self) -> bool {
        self.requested == Some(0)
    }

    /// Positive requested timeout, if any.
    pub(crate) fn positive(&self) -> Option<u32> {
        self.requested.filter(|&ticks| ticks > 0)
    }

    /// Arm the one-shot timer for a positive timeout. No-op otherwise.
    pub(crate) fn arm(&mut self) {
        debug_assert!(!self.armed, "timeout armed twice");
        if let Some(ticks) = self.positive() {
            self.sched.arm_timer(&self.task, Ticks::from(ticks));
            self.armed = true;
        }
    }

    /// Disarm the timer and record the ticks it had left.
    ///
    /// Called once, on the condition-driven exit. A timer that already fired
    /// leaves zero.
    pub(crate) fn cancel_and_remaining(&mut self) -> Option<u32> {
        if self.armed {
            let left = self.sched.cancel_timer(&self.task);
            self.armed = false;
            self.remaining = Some(u32::try_from(left).unwrap_or(u32::MAX));
        }
        self.remaining
    }

    /// The timer fired: nothing is left.
    pub(crate) fn expired(&mut self) {
        self.armed = false;
        self.remaining = self.requested.map(|_| 0);
    }

    /// Sleep for the whole positive timeout, then report it used up.
    pub(crate) fn delay(&mut self) {
        if let Some(ticks) = self.positive() {
            log::debug!(
                "[select] task {} has nothing to wait on, sleeping {} ticks",
                self.task.id(),
                ticks
            );
            self.sched.sleep(&self.task, Ticks::from(ticks));
            self.expired();
        }
    }

    /// Ticks left to report back; `None` for an infinite wait.
    pub(crate) fn remaining(&self) -> Option<u32> {
        self.remaining
    }
}

impl Drop for TimeoutController {
    fn drop(&mut self) {
        if self.armed {
            self.sched.cancel_timer(&self.task);
        }
    }
}
