// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-condition waiter: block one task on N conditions at once.
//!
//! The waiter owns a fixed slot array. Binding slot `i` to a condition hands
//! the condition a weak [`WaitSignal`] carrying `(waiter, i, registration
//! id)`; the slot keeps the strong handle plus a weak reference back to the
//! condition. Both sides therefore refer to each other by index and id, never
//! by address, and [`MultiWaiter::release`] undoes every registration.
//!
//! Release runs on every exit path: explicitly, or from `Drop`.

mod fired;

use crate::error::{Error, Result};
use crate::kcond::{KCond, WaitSignal};
use crate::sched::{Scheduler, Task, WokenBy};
use fired::FiredSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Fixed-capacity set of wait slots owned by one task for one call.
pub struct MultiWaiter {
    sched: Scheduler,
    shared: Arc<WaiterShared>,
    slots: Vec<WaitSlot>,
    bound: usize,
    released: bool,
}

/// State reachable from signalers.
struct WaiterShared {
    task: Task,
    fired: FiredSet,
    released: AtomicBool,
}

#[derive(Default)]
struct WaitSlot {
    binding: Option<SlotBinding>,
}

struct SlotBinding {
    cond: Weak<KCond>,
    slot_id: u64,
    // Keeps the condition's weak hook alive until release.
    _signal: Arc<dyn WaitSignal>,
}

struct SlotSignal {
    waiter: Weak<WaiterShared>,
    slot_index: usize,
    slot_id: u64,
}

impl WaitSignal for SlotSignal {
    fn signal(&self) {
        let Some(shared) = self.waiter.upgrade() else {
            log::debug!("[waiter] signal for slot {} after waiter drop", self.slot_index);
            return;
        };

        assert!(
            !shared.released.load(Ordering::Acquire),
            "condition signaled slot {} (id {}) of a released waiter",
            self.slot_index,
            self.slot_id
        );

        shared.fired.mark(self.slot_index);
        shared.task.wake(WokenBy::Condition);
    }

    fn id(&self) -> u64 {
        self.slot_id
    }
}

impl MultiWaiter {
    /// Allocate `slot_count` empty slots for `task`.
    ///
    /// Fails with [`Error::OutOfMemory`] when `slot_count` exceeds
    /// `max_slots` or the slot storage cannot be reserved. Any wake reason
    /// left over from an earlier wait is cleared, so only signals delivered
    /// after binding can wake this waiter.
    pub fn allocate(
        sched: &Scheduler,
        task: Task,
        slot_count: usize,
        max_slots: usize,
    ) -> Result<Self> {
        if slot_count > max_slots {
            log::debug!(
                "[waiter] refusing {} slots (ceiling {})",
                slot_count,
                max_slots
            );
            return Err(Error::OutOfMemory);
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(slot_count)
            .map_err(|_| Error::OutOfMemory)?;
        slots.resize_with(slot_count, WaitSlot::default);

        let fired = FiredSet::try_new(slot_count).ok_or(Error::OutOfMemory)?;

        task.reset_wake_reason();

        Ok(Self {
            sched: sched.clone(),
            shared: Arc::new(WaiterShared {
                task,
                fired,
                released: AtomicBool::new(false),
            }),
            slots,
            bound: 0,
            released: false,
        })
    }

    /// Bind `slot_index` to `cond`, registering it on the condition's wait
    /// list. Slots are bound in ascending order.
    pub fn bind(&mut self, slot_index: usize, cond: &Arc<KCond>) {
        assert!(!self.released, "bind on a released waiter");
        assert!(
            slot_index < self.slots.len(),
            "wait slot {} out of range ({} slots)",
            slot_index,
            self.slots.len()
        );
        assert!(
            self.slots[slot_index].binding.is_none(),
            "wait slot {} bound twice",
            slot_index
        );
        debug_assert_eq!(slot_index, self.bound, "wait slots bound out of order");

        let slot_id = NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed);
        let signal: Arc<dyn WaitSignal> = Arc::new(SlotSignal {
            waiter: Arc::downgrade(&self.shared),
            slot_index,
            slot_id,
        });

        cond.add_waiter(&signal);
        self.slots[slot_index].binding = Some(SlotBinding {
            cond: Arc::downgrade(cond),
            slot_id,
            _signal: signal,
        });
        self.bound += 1;
    }

    /// Suspend the owning task until a bound condition signals or its
    /// wakeup timer fires.
    pub fn block_until_woken(&self) -> WokenBy {
        assert!(!self.released, "blocking on a released waiter");
        self.sched.block_until_woken(&self.shared.task)
    }

    /// Slots whose condition signaled since the last call, ascending.
    pub fn fired_slots(&self) -> Vec<usize> {
        self.shared.fired.drain()
    }

    /// Forget fired slots (after a timeout-driven wake).
    pub fn discard_fired(&self) {
        let _ = self.shared.fired.drain();
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        !self.shared.fired.is_empty()
    }

    /// Slot capacity fixed at allocation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots bound so far.
    #[must_use]
    pub fn bound(&self) -> usize {
        self.bound
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Detach every slot from its condition and free the slot array.
    ///
    /// A second call is a no-op.
    pub fn release(&mut self) {
        if self.released {
            log::debug!("[waiter] release on an already released waiter");
            return;
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(binding) = slot.binding.take() else {
                continue;
            };
            if let Some(cond) = binding.cond.upgrade() {
                assert!(
                    cond.remove_waiter(binding.slot_id),
                    "wait slot {} (id {}) missing from kcond {}",
                    index,
                    binding.slot_id,
                    cond.id()
                );
            }
        }

        self.shared.released.store(true, Ordering::Release);
        self.slots = Vec::new();
        self.released = true;
        log::trace!(
            "[waiter] task {} released {} slot(s)",
            self.shared.task.id(),
            self.bound
        );
    }
}

impl Drop for MultiWaiter {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}

impl std::fmt::Debug for MultiWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiWaiter")
            .field("task", &self.shared.task.id())
            .field("slots", &self.slots.len())
            .field("bound", &self.bound)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests;
