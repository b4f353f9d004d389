// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Select engine: wait until any handle in up to three interest sets is
//! ready, or until a timeout expires.
//!
//! # Flow
//!
//! 1. Validate the bound and resolve every handle below it (`BadHandle` on
//!    the first one that is not open).
//! 2. Unless the call polls (zero timeout), collect the conditions the
//!    interesting streams expose. None at all turns the call into a pure
//!    delay.
//! 3. Bind a [`MultiWaiter`] slot per condition: read, then write, then
//!    exception, ascending handles within each.
//! 4. Arm the timer once. A pair that turned ready between collection and
//!    binding skips the block, since its signal reached no slot. Otherwise
//!    block; a condition wake whose re-check finds nothing ready is spurious
//!    and blocks again on the same waiter.
//! 5. Release the waiter, re-query readiness and reduce the sets in place.

mod timeout;

use crate::abi::FdSet;
use crate::config::MAX_HANDLES;
use crate::error::{Error, Result};
use crate::kcond::KCond;
use crate::sched::{Scheduler, WokenBy};
use crate::vfs::{Direction, HandleTable};
use crate::waiter::MultiWaiter;
use std::sync::Arc;
use timeout::TimeoutController;

/// Interest sets for one call, one optional [`FdSet`] per direction.
///
/// On success the sets present are reduced to the handles that are ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestSets {
    sets: [Option<FdSet>; 3],
}

impl InterestSets {
    /// No set for any direction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`InterestSets::set`].
    #[must_use]
    pub fn with(mut self, dir: Direction, set: FdSet) -> Self {
        self.sets[dir.index()] = Some(set);
        self
    }

    /// Install (or remove, with `None`) the set for `dir`.
    pub fn set(&mut self, dir: Direction, set: Option<FdSet>) {
        self.sets[dir.index()] = set;
    }

    #[must_use]
    pub fn get(&self, dir: Direction) -> Option<&FdSet> {
        self.sets[dir.index()].as_ref()
    }

    pub fn get_mut(&mut self, dir: Direction) -> Option<&mut FdSet> {
        self.sets[dir.index()].as_mut()
    }

    #[must_use]
    pub fn read(&self) -> Option<&FdSet> {
        self.get(Direction::Read)
    }

    #[must_use]
    pub fn write(&self) -> Option<&FdSet> {
        self.get(Direction::Write)
    }

    #[must_use]
    pub fn except(&self) -> Option<&FdSet> {
        self.get(Direction::Exception)
    }

    /// Present sets paired with their direction, in binding order.
    fn present(&self) -> impl Iterator<Item = (Direction, &FdSet)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|dir| self.get(dir).map(|set| (dir, set)))
    }
}

/// Result of a successful select call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOutcome {
    /// Ready (handle, direction) pairs across all sets.
    pub ready: usize,
    /// Unused timeout ticks; `None` when no timeout was given.
    pub remaining: Option<u32>,
}

/// A bound slot's origin, for tracing which condition woke the task.
struct SlotOrigin {
    dir: Direction,
    fd: usize,
    cond: Arc<KCond>,
    /// Readiness sampled before the condition was looked up.
    was_ready: bool,
}

/// Select engine over a scheduler and a handle table.
pub struct SelectEngine<'a> {
    sched: &'a Scheduler,
    handles: &'a HandleTable,
    max_wait_slots: usize,
}

impl<'a> SelectEngine<'a> {
    pub fn new(sched: &'a Scheduler, handles: &'a HandleTable, max_wait_slots: usize) -> Self {
        Self {
            sched,
            handles,
            max_wait_slots,
        }
    }

    /// Wait on `sets` for handles below `nfds`.
    ///
    /// `timeout` is in ticks: `None` waits indefinitely, `Some(0)` polls.
    /// Handles at or above `nfds` are ignored and cleared from the output.
    pub fn select(
        &self,
        nfds: usize,
        sets: &mut InterestSets,
        timeout: Option<u32>,
    ) -> Result<SelectOutcome> {
        if nfds > MAX_HANDLES {
            return Err(Error::InvalidArgument(format!(
                "nfds {} exceeds {}",
                nfds, MAX_HANDLES
            )));
        }

        self.validate(nfds, sets)?;

        let task = self.sched.current_task();
        let mut timer = TimeoutController::new(self.sched, &task, timeout);

        log::debug!(
            "[select] task {} nfds={} timeout={:?}",
            task.id(),
            nfds,
            timeout
        );

        if !timer.is_poll() {
            let origins = self.collect_conditions(nfds, sets);
            if origins.is_empty() {
                timer.delay();
            } else {
                self.wait(nfds, sets, &origins, &mut timer)?;
            }
        }

        let ready = self.reduce(nfds, sets);
        let outcome = SelectOutcome {
            ready,
            remaining: timer.remaining(),
        };
        log::debug!("[select] task {} -> {:?}", task.id(), outcome);
        Ok(outcome)
    }

    /// Every handle referenced below `nfds` must be open.
    fn validate(&self, nfds: usize, sets: &InterestSets) -> Result<()> {
        for (dir, set) in sets.present() {
            for fd in set.iter_below(nfds) {
                if let Err(e) = self.handles.resolve(fd) {
                    log::debug!("[select] {} set holds handle {} which is not open", dir.name(), fd);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// (direction, handle) pairs that expose a condition, in slot order.
    fn collect_conditions(&self, nfds: usize, sets: &InterestSets) -> Vec<SlotOrigin> {
        let mut origins = Vec::new();
        for (dir, set) in sets.present() {
            for fd in set.iter_below(nfds) {
                let Ok(stream) = self.handles.resolve(fd) else {
                    continue;
                };
                let was_ready = stream.is_ready(dir);
                if let Some(cond) = stream.condition_for(dir) {
                    origins.push(SlotOrigin {
                        dir,
                        fd,
                        cond,
                        was_ready,
                    });
                }
            }
        }
        origins
    }

    fn wait(
        &self,
        nfds: usize,
        sets: &InterestSets,
        origins: &[SlotOrigin],
        timer: &mut TimeoutController,
    ) -> Result<()> {
        let task = self.sched.current_task();
        let mut waiter =
            MultiWaiter::allocate(self.sched, task, origins.len(), self.max_wait_slots)?;
        for (index, origin) in origins.iter().enumerate() {
            waiter.bind(index, &origin.cond);
        }

        timer.arm();

        if let Some(origin) = self.turned_ready(origins) {
            log::debug!(
                "[select] {} handle {} turned ready before blocking",
                origin.dir.name(),
                origin.fd
            );
            timer.cancel_and_remaining();
            waiter.release();
            return Ok(());
        }

        loop {
            match waiter.block_until_woken() {
                WokenBy::Timeout => {
                    waiter.discard_fired();
                    timer.expired();
                    log::trace!("[select] timed out");
                    break;
                }
                WokenBy::Condition => {
                    for slot in waiter.fired_slots() {
                        let origin = &origins[slot];
                        log::trace!(
                            "[select] slot {} fired ({} handle {})",
                            slot,
                            origin.dir.name(),
                            origin.fd
                        );
                    }

                    if self.count_ready(nfds, sets) == 0 {
                        log::debug!("[select] spurious wakeup, blocking again");
                        continue;
                    }

                    timer.cancel_and_remaining();
                    break;
                }
            }
        }

        waiter.release();
        Ok(())
    }

    /// First bound pair that was not ready at collection and is now.
    fn turned_ready<'o>(&self, origins: &'o [SlotOrigin]) -> Option<&'o SlotOrigin> {
        origins
            .iter()
            .find(|origin| !origin.was_ready && self.handles.is_ready(origin.fd, origin.dir))
    }

    fn count_ready(&self, nfds: usize, sets: &InterestSets) -> usize {
        sets.present()
            .map(|(dir, set)| {
                set.iter_below(nfds)
                    .filter(|&fd| self.handles.is_ready(fd, dir))
                    .count()
            })
            .sum()
    }

    /// Keep only ready handles below `nfds`; returns how many remain.
    fn reduce(&self, nfds: usize, sets: &mut InterestSets) -> usize {
        let mut ready = 0;
        for dir in Direction::ALL {
            if let Some(set) = sets.get_mut(dir) {
                set.retain(|fd| fd < nfds && self.handles.is_ready(fd, dir));
                ready += set.count();
            }
        }
        ready
    }
}
