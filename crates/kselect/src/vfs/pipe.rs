// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded byte pipe with non-blocking ends.
//!
//! - Read end: ready when bytes are buffered or the write end is closed (EOF).
//! - Write end: ready when buffer space remains or the read end is closed
//!   (the write then fails with `BrokenPipe`).
//! - Neither end has exception conditions.
//!
//! Writes signal the read condition; reads signal the write condition.

use super::{Direction, Stream};
use crate::error::{Error, Result};
use crate::kcond::KCond;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct PipeState {
    data: VecDeque<u8>,
    capacity: usize,
    reader_open: bool,
    writer_open: bool,
}

struct PipeShared {
    state: Mutex<PipeState>,
    read_cond: Arc<KCond>,
    write_cond: Arc<KCond>,
}

/// Read end of a pipe.
pub struct PipeReader {
    shared: Arc<PipeShared>,
}

/// Write end of a pipe.
pub struct PipeWriter {
    shared: Arc<PipeShared>,
}

/// Create a pipe buffering up to `capacity` bytes.
pub fn pipe(capacity: usize) -> (PipeReader, PipeWriter) {
    let capacity = capacity.max(1);
    let shared = Arc::new(PipeShared {
        state: Mutex::new(PipeState {
            data: VecDeque::with_capacity(capacity),
            capacity,
            reader_open: true,
            writer_open: true,
        }),
        read_cond: KCond::shared(),
        write_cond: KCond::shared(),
    });

    (
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

impl PipeReader {
    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` at EOF and [`Error::WouldBlock`] when empty with the
    /// writer still open.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let n = {
            let mut state = self.shared.state.lock();
            if state.data.is_empty() {
                return if state.writer_open {
                    Err(Error::WouldBlock)
                } else {
                    Ok(0)
                };
            }

            let n = buf.len().min(state.data.len());
            for (dst, src) in buf.iter_mut().zip(state.data.drain(..n)) {
                *dst = src;
            }
            n
        };

        if n > 0 {
            self.shared.write_cond.signal_all();
        }
        Ok(n)
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.state.lock().data.len()
    }
}

impl PipeWriter {
    /// Write as much of `data` as fits.
    ///
    /// Fails with [`Error::BrokenPipe`] once the reader is gone and
    /// [`Error::WouldBlock`] when the buffer is full.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let n = {
            let mut state = self.shared.state.lock();
            if !state.reader_open {
                return Err(Error::BrokenPipe);
            }

            let space = state.capacity - state.data.len();
            if space == 0 && !data.is_empty() {
                return Err(Error::WouldBlock);
            }

            let n = space.min(data.len());
            state.data.extend(&data[..n]);
            n
        };

        if n > 0 {
            self.shared.read_cond.signal_all();
        }
        Ok(n)
    }

    /// Free buffer space.
    #[must_use]
    pub fn space(&self) -> usize {
        let state = self.shared.state.lock();
        state.capacity - state.data.len()
    }
}

impl Stream for PipeReader {
    fn is_ready(&self, dir: Direction) -> bool {
        match dir {
            Direction::Read => {
                let state = self.shared.state.lock();
                !state.data.is_empty() || !state.writer_open
            }
            Direction::Write | Direction::Exception => false,
        }
    }

    fn condition_for(&self, dir: Direction) -> Option<Arc<KCond>> {
        match dir {
            Direction::Read => Some(Arc::clone(&self.shared.read_cond)),
            Direction::Write | Direction::Exception => None,
        }
    }
}

impl Stream for PipeWriter {
    fn is_ready(&self, dir: Direction) -> bool {
        match dir {
            Direction::Write => {
                let state = self.shared.state.lock();
                state.data.len() < state.capacity || !state.reader_open
            }
            Direction::Read | Direction::Exception => false,
        }
    }

    fn condition_for(&self, dir: Direction) -> Option<Arc<KCond>> {
        match dir {
            Direction::Write => Some(Arc::clone(&self.shared.write_cond)),
            Direction::Read | Direction::Exception => None,
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.shared.state.lock().reader_open = false;
        self.shared.write_cond.signal_all();
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.shared.state.lock().writer_open = false;
        self.shared.read_cond.signal_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_flows_and_readiness_follows() {
        let (r, w) = pipe(4);
        assert!(!r.is_ready(Direction::Read));
        assert!(w.is_ready(Direction::Write));

        assert_eq!(w.write(b"abcdef").unwrap(), 4);
        assert!(r.is_ready(Direction::Read));
        assert!(!w.is_ready(Direction::Write));
        assert!(matches!(w.write(b"x"), Err(Error::WouldBlock)));

        let mut buf = [0u8; 3];
        assert_eq!(r.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
        assert!(w.is_ready(Direction::Write));
        assert_eq!(w.space(), 3);
    }

    #[test]
    fn empty_read_would_block_until_writer_closes() {
        let (r, w) = pipe(8);
        let mut buf = [0u8; 4];
        assert!(matches!(r.read(&mut buf), Err(Error::WouldBlock)));

        drop(w);
        assert!(r.is_ready(Direction::Read));
        assert_eq!(r.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_after_reader_close_is_broken_pipe() {
        let (r, w) = pipe(8);
        drop(r);
        assert!(w.is_ready(Direction::Write));
        assert!(matches!(w.write(b"x"), Err(Error::BrokenPipe)));
    }

    #[test]
    fn exception_direction_has_no_condition() {
        let (r, w) = pipe(8);
        assert!(r.condition_for(Direction::Exception).is_none());
        assert!(w.condition_for(Direction::Exception).is_none());
        assert!(r.condition_for(Direction::Write).is_none());
        assert!(w.condition_for(Direction::Read).is_none());
    }
}
