// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernel context: configuration, scheduler and handle table bundled for the
//! select entry points.

use crate::config::KernelConfig;
use crate::error::Result;
use crate::sched::Scheduler;
use crate::select::{InterestSets, SelectEngine, SelectOutcome};
use crate::vfs::HandleTable;

/// One simulated kernel instance.
///
/// Threads sharing a `Kernel` are the tasks of that kernel; each may call
/// [`Kernel::select`] concurrently.
pub struct Kernel {
    config: KernelConfig,
    sched: Scheduler,
    handles: HandleTable,
}

impl Kernel {
    /// Validate `config` and start the scheduler (and its ticker in realtime
    /// mode).
    pub fn new(config: KernelConfig) -> Result<Self> {
        let sched = Scheduler::with_config(&config)?;
        log::debug!(
            "[kernel] started: hz={} max_wait_slots={} tick_mode={:?}",
            config.timer_hz,
            config.max_wait_slots,
            config.tick_mode
        );

        Ok(Self {
            config,
            sched,
            handles: HandleTable::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    #[must_use]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Wait until a handle below `nfds` in `sets` is ready.
    ///
    /// `timeout` is in ticks (`None` waits indefinitely, `Some(0)` polls).
    /// See [`SelectEngine::select`].
    pub fn select(
        &self,
        nfds: usize,
        sets: &mut InterestSets,
        timeout: Option<u32>,
    ) -> Result<SelectOutcome> {
        SelectEngine::new(&self.sched, &self.handles, self.config.max_wait_slots)
            .select(nfds, sets, timeout)
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("sched", &self.sched)
            .field("open_handles", &self.handles.open_count())
            .finish()
    }
}
