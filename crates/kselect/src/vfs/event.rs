// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event stream: readiness under the control of the application.
//!
//! The stream analogue of a guard condition. Readiness flags are set
//! explicitly, and signaling is decoupled from readiness so a caller can
//! deliver a signal whose predicate is still false.

use super::{Direction, Stream};
use crate::kcond::KCond;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct EventStream {
    ready: [AtomicBool; 3],
    conds: [Option<Arc<KCond>>; 3],
}

impl EventStream {
    /// Not ready in any direction, with a condition for every direction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: [
                AtomicBool::new(false),
                AtomicBool::new(false),
                AtomicBool::new(false),
            ],
            conds: [
                Some(KCond::shared()),
                Some(KCond::shared()),
                Some(KCond::shared()),
            ],
        }
    }

    /// Drop the condition for `dir`: the stream can still be queried in that
    /// direction but never contributes a wait slot.
    #[must_use]
    pub fn without_condition(mut self, dir: Direction) -> Self {
        self.conds[dir.index()] = None;
        self
    }

    /// Set readiness in `dir`, signaling waiters when it becomes true.
    pub fn set_ready(&self, dir: Direction, ready: bool) {
        self.ready[dir.index()].store(ready, Ordering::Release);
        if ready {
            self.signal(dir);
        }
    }

    /// Signal the condition for `dir` without touching readiness.
    ///
    /// Returns the number of waiters signaled.
    pub fn signal(&self, dir: Direction) -> usize {
        self.conds[dir.index()]
            .as_ref()
            .map_or(0, |cond| cond.signal_all())
    }

    /// Condition for `dir`, if the stream has one.
    #[must_use]
    pub fn condition(&self, dir: Direction) -> Option<&Arc<KCond>> {
        self.conds[dir.index()].as_ref()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for EventStream {
    fn is_ready(&self, dir: Direction) -> bool {
        self.ready[dir.index()].load(Ordering::Acquire)
    }

    fn condition_for(&self, dir: Direction) -> Option<Arc<KCond>> {
        self.conds[dir.index()].clone()
    }
}
