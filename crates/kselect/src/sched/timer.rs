// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot wakeup timers ordered by absolute deadline.

use super::task::{Task, TaskInner};
use super::Ticks;
use std::collections::BTreeMap;
use std::sync::Weak;

/// Pending timers keyed by `(deadline, arming sequence)`.
///
/// Entries hold weak task references: a task that went away simply never
/// fires.
#[derive(Default)]
pub(super) struct TimerQueue {
    entries: BTreeMap<(Ticks, u64), Weak<TaskInner>>,
    next_seq: u64,
}

impl TimerQueue {
    pub(super) fn insert(&mut self, deadline: Ticks, task: &Task) -> u64 {
        self.next_seq = self.next_seq.wrapping_add(1);
        let seq = self.next_seq;
        self.entries
            .insert((deadline, seq), std::sync::Arc::downgrade(&task.inner));
        seq
    }

    pub(super) fn remove(&mut self, deadline: Ticks, seq: u64) -> bool {
        self.entries.remove(&(deadline, seq)).is_some()
    }

    /// Remove every entry with `deadline <= now`, earliest first.
    pub(super) fn drain_expired(&mut self, now: Ticks) -> Vec<(u64, Task)> {
        let pending = self.entries.split_off(&(now.saturating_add(1), 0));
        let expired = std::mem::replace(&mut self.entries, pending);

        expired
            .into_iter()
            .filter_map(|((_, seq), weak)| weak.upgrade().map(|inner| (seq, Task { inner })))
            .collect()
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn next_deadline(&self) -> Option<Ticks> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }
}
