// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernel condition variables streams expose to signal readiness changes.
//!
//! A `KCond` never points at a waiter directly. Its wait list holds
//! `(registration id, Weak<dyn WaitSignal>)` hooks: the waiter side owns the
//! strong signal handle, so a hook whose waiter is gone can never be
//! dereferenced, and registration ids make removal explicit.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Handle a waiter registers on a condition's wait list.
///
/// Conditions retain a weak reference and call `signal()` when they are
/// signaled. `id()` is stable per registration so the waiter can detach.
pub trait WaitSignal: Send + Sync {
    /// Notify the waiter that the associated slot fired.
    fn signal(&self);

    /// Stable identifier for this registration.
    fn id(&self) -> u64;
}

struct WaitHook {
    id: u64,
    signal: Weak<dyn WaitSignal>,
}

/// Condition with a wait list of registered waiter slots.
pub struct KCond {
    id: u64,
    wait_list: Mutex<Vec<WaitHook>>,
}

impl KCond {
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            wait_list: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for streams that share the condition.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Append a registration to the wait list.
    pub fn add_waiter(&self, signal: &Arc<dyn WaitSignal>) {
        let mut hooks = self.wait_list.lock();
        hooks.retain(|hook| hook.signal.strong_count() > 0);
        log::trace!("[kcond] {} add waiter signal={}", self.id, signal.id());
        hooks.push(WaitHook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
    }

    /// Remove a registration. Returns `false` if it was not on the list.
    pub fn remove_waiter(&self, signal_id: u64) -> bool {
        let mut hooks = self.wait_list.lock();
        let before = hooks.len();
        hooks.retain(|hook| hook.id != signal_id);
        hooks.len() != before
    }

    /// Wake the first live waiter, moving it to the back of the list.
    pub fn signal_one(&self) -> bool {
        let mut hooks = self.wait_list.lock();
        hooks.retain(|hook| hook.signal.strong_count() > 0);

        for pos in 0..hooks.len() {
            if let Some(signal) = hooks[pos].signal.upgrade() {
                signal.signal();
                let hook = hooks.remove(pos);
                hooks.push(hook);
                return true;
            }
        }
        false
    }

    /// Wake every live waiter. Returns how many were signaled.
    pub fn signal_all(&self) -> usize {
        let mut hooks = self.wait_list.lock();
        let mut signaled = 0;

        hooks.retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                signaled += 1;
                true
            } else {
                false
            }
        });

        if signaled > 0 {
            log::trace!("[kcond] {} signaled {} waiter(s)", self.id, signaled);
        }
        signaled
    }

    /// Number of registrations currently on the wait list.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.wait_list.lock().len()
    }
}

impl Default for KCond {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KCond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KCond")
            .field("id", &self.id)
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
