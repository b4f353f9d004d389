// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers for kselect integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use kselect::vfs::EventStream;
use kselect::{Direction, FdSet, InterestSets, Kernel, KernelConfig, Scheduler};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Manually ticked kernel.
pub fn manual_kernel() -> Arc<Kernel> {
    Arc::new(Kernel::new(KernelConfig::manual()).expect("manual kernel"))
}

/// Install `count` event streams at handles `0..count`.
pub fn install_events(kernel: &Kernel, count: usize) -> Vec<Arc<EventStream>> {
    (0..count)
        .map(|expected| {
            let event = Arc::new(EventStream::new());
            let fd = kernel
                .handles()
                .install(event.clone())
                .expect("install event stream");
            assert_eq!(fd, expected);
            event
        })
        .collect()
}

pub fn fd_set(fds: &[usize]) -> FdSet {
    fds.iter().copied().collect()
}

pub fn read_interest(fds: &[usize]) -> InterestSets {
    InterestSets::new().with(Direction::Read, fd_set(fds))
}

/// Spin until `cond` holds, failing the test after a generous bound.
pub fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

/// Block until some task is parked after at least `blocks` suspensions.
pub fn wait_blocked(sched: &Scheduler, blocks: u64) {
    wait_for("a blocked task", || {
        sched.blocked_tasks() > 0 && sched.block_count() >= blocks
    });
}

/// Run `action` on a helper thread once the select caller has blocked.
pub fn on_block<F, T>(kernel: &Arc<Kernel>, action: F) -> JoinHandle<T>
where
    F: FnOnce(&Kernel) -> T + Send + 'static,
    T: Send + 'static,
{
    let kernel = Arc::clone(kernel);
    thread::spawn(move || {
        wait_blocked(kernel.scheduler(), 1);
        action(&kernel)
    })
}
