// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Syscall boundary: caller byte buffers in, errno-style return out.
//!
//! Caller memory is modeled as byte slices in the `fd_set` / `timeval`
//! layouts. A missing buffer is the null pointer of the C interface.

mod fdset;
mod timeval;

pub use fdset::FdSet;
pub use timeval::TimeVal;

use crate::config::MAX_HANDLES;
use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::select::InterestSets;
use crate::vfs::Direction;

/// `select(2)`: returns the ready count, or a negative errno.
///
/// On success the present sets are overwritten with the ready handles and,
/// when a timeval was supplied, it is overwritten with the unused time.
pub fn sys_select(
    kernel: &Kernel,
    nfds: i32,
    rfds: Option<&mut [u8]>,
    wfds: Option<&mut [u8]>,
    efds: Option<&mut [u8]>,
    tv: Option<&mut [u8]>,
) -> isize {
    match select_user(kernel, nfds, [rfds, wfds, efds], tv) {
        Ok(ready) => ready as isize,
        Err(e) => {
            log::debug!("[select] sys_select failed: {}", e);
            e.errno() as isize
        }
    }
}

fn select_user(
    kernel: &Kernel,
    nfds: i32,
    mut user_sets: [Option<&mut [u8]>; 3],
    mut user_tv: Option<&mut [u8]>,
) -> Result<usize> {
    let nfds = usize::try_from(nfds)
        .ok()
        .filter(|&n| n <= MAX_HANDLES)
        .ok_or_else(|| {
            Error::InvalidArgument(format!("nfds {} outside 0..={}", nfds, MAX_HANDLES))
        })?;

    let mut sets = InterestSets::new();
    for dir in Direction::ALL {
        if let Some(bytes) = user_sets[dir.index()].as_deref() {
            sets.set(dir, Some(FdSet::from_bytes(bytes)?));
        }
    }

    let hz = kernel.config().timer_hz;
    let tv = user_tv.as_deref().map(TimeVal::from_bytes).transpose()?;
    let timeout = tv.map(|tv| tv.to_ticks(hz)).transpose()?;

    debug_dump_select_args(nfds, &sets, tv.as_ref());

    let outcome = kernel.select(nfds, &mut sets, timeout)?;

    for dir in Direction::ALL {
        if let (Some(out), Some(set)) = (user_sets[dir.index()].as_deref_mut(), sets.get(dir)) {
            set.write_bytes(out)?;
        }
    }
    if let (Some(out), Some(remaining)) = (user_tv.as_deref_mut(), outcome.remaining) {
        TimeVal::from_ticks(remaining, hz).write_bytes(out)?;
    }

    Ok(outcome.ready)
}

/// Trace-level dump of decoded select arguments.
pub fn debug_dump_select_args(nfds: usize, sets: &InterestSets, tv: Option<&TimeVal>) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }

    log::trace!("[select] sys_select(nfds: {}", nfds);
    for dir in Direction::ALL {
        match sets.get(dir) {
            Some(set) => {
                let fds: Vec<usize> = set.iter_below(nfds).collect();
                log::trace!("[select]     {}: {:?}", dir.name(), fds);
            }
            None => log::trace!("[select]     {}: none", dir.name()),
        }
    }
    match tv {
        Some(tv) => log::trace!("[select]     tv: {} secs, {} usecs)", tv.sec, tv.usec),
        None => log::trace!("[select]     tv: none)"),
    }
}
