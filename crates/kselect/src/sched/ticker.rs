// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Realtime clock driver: a background thread standing in for the timer
//! interrupt.

use super::SchedInner;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::io;
use std::sync::Weak;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Ticker thread plus its stop channel.
///
/// Dropping the sender disconnects the channel, which the thread observes
/// from `recv_deadline`.
pub(super) struct Ticker {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    pub(super) fn spawn(sched: Weak<SchedInner>, period: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name("kselect-ticker".into())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    match stop_rx.recv_deadline(next) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let Some(inner) = sched.upgrade() else {
                        break;
                    };
                    inner.tick();
                    next += period;
                }
                log::debug!("[sched] ticker stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            // The ticker may hold the last scheduler reference mid-tick.
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
