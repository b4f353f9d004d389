// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle table and the stream readiness capability the select engine
//! consumes.

mod event;
mod pipe;

pub use event::EventStream;
pub use pipe::{pipe, PipeReader, PipeWriter};

use crate::config::MAX_HANDLES;
use crate::error::{Error, Result};
use crate::kcond::KCond;
use parking_lot::RwLock;
use std::sync::Arc;

/// Readiness category of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
    Exception,
}

impl Direction {
    /// Every direction, in slot binding order.
    pub const ALL: [Direction; 3] = [Direction::Read, Direction::Write, Direction::Exception];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Direction::Read => 0,
            Direction::Write => 1,
            Direction::Exception => 2,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
            Direction::Exception => "except",
        }
    }
}

/// Per-direction readiness capability of an open stream.
///
/// `is_ready` must not block. `condition_for` returns the condition the
/// stream signals when readiness in that direction may have changed, or
/// `None` if the stream has no such concept; the answer must not change over
/// the stream's lifetime.
pub trait Stream: Send + Sync {
    fn is_ready(&self, dir: Direction) -> bool;

    fn condition_for(&self, dir: Direction) -> Option<Arc<KCond>>;
}

/// Fixed-size table mapping handle indices to open streams.
pub struct HandleTable {
    slots: RwLock<Vec<Option<Arc<dyn Stream>>>>,
}

impl HandleTable {
    #[must_use]
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_HANDLES);
        slots.resize_with(MAX_HANDLES, || None);
        Self {
            slots: RwLock::new(slots),
        }
    }

    /// Install `stream` at the lowest free handle.
    pub fn install(&self, stream: Arc<dyn Stream>) -> Result<usize> {
        let mut slots = self.slots.write();
        let fd = slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyHandles)?;
        slots[fd] = Some(stream);
        log::trace!("[vfs] installed handle {}", fd);
        Ok(fd)
    }

    /// Install `stream` at `fd`, returning the stream it replaced.
    pub fn install_at(&self, fd: usize, stream: Arc<dyn Stream>) -> Result<Option<Arc<dyn Stream>>> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(fd).ok_or_else(|| {
            Error::InvalidArgument(format!("handle {} out of range (max {})", fd, MAX_HANDLES))
        })?;
        Ok(slot.replace(stream))
    }

    /// Close `fd`, returning its stream.
    pub fn close(&self, fd: usize) -> Result<Arc<dyn Stream>> {
        self.slots
            .write()
            .get_mut(fd)
            .and_then(Option::take)
            .ok_or(Error::BadHandle(fd))
    }

    /// Resolve `fd` to its open stream.
    pub fn resolve(&self, fd: usize) -> Result<Arc<dyn Stream>> {
        self.slots
            .read()
            .get(fd)
            .and_then(Clone::clone)
            .ok_or(Error::BadHandle(fd))
    }

    /// Whether `fd` is open and ready in `dir`. Closed handles are not ready.
    #[must_use]
    pub fn is_ready(&self, fd: usize, dir: Direction) -> bool {
        self.resolve(fd).is_ok_and(|stream| stream.is_ready(dir))
    }

    /// Number of open handles.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
