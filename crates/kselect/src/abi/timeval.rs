// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `struct timeval` and its conversion to timer ticks.

use crate::config::{MAX_TIMEOUT_TICKS, TIMEVAL_BYTES};
use crate::error::{Error, Result};

const USEC_PER_SEC: u64 = 1_000_000;

/// Tick rate usable as a divisor of one second in microseconds.
fn clamp_hz(hz: u32) -> u64 {
    u64::from(hz).clamp(1, USEC_PER_SEC)
}

/// Seconds plus microseconds, as exchanged with the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeVal {
    pub sec: i64,
    pub usec: i64,
}

impl TimeVal {
    #[must_use]
    pub const fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }

    /// Ticks at `hz`, rounded down to whole ticks and clamped to
    /// [`MAX_TIMEOUT_TICKS`]. `hz` is taken within `1..=1_000_000`.
    ///
    /// Negative fields and `usec` of a second or more are rejected.
    pub fn to_ticks(&self, hz: u32) -> Result<u32> {
        let (Ok(sec), Ok(usec)) = (u64::try_from(self.sec), u64::try_from(self.usec)) else {
            return Err(Error::InvalidArgument(format!(
                "negative timeval {}s {}us",
                self.sec, self.usec
            )));
        };
        if usec >= USEC_PER_SEC {
            return Err(Error::InvalidArgument(format!(
                "timeval usec {} out of range",
                usec
            )));
        }

        let hz = clamp_hz(hz);
        let ticks = sec
            .saturating_mul(hz)
            .saturating_add(usec / (USEC_PER_SEC / hz));
        Ok(u32::try_from(ticks).unwrap_or(MAX_TIMEOUT_TICKS))
    }

    /// Time represented by `ticks` at `hz`.
    #[must_use]
    pub fn from_ticks(ticks: u32, hz: u32) -> Self {
        let ticks = u64::from(ticks);
        let hz = clamp_hz(hz);
        Self {
            sec: (ticks / hz) as i64,
            usec: ((ticks % hz) * (USEC_PER_SEC / hz)) as i64,
        }
    }

    /// Decode two little-endian `i64` (seconds, then microseconds).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TIMEVAL_BYTES {
            return Err(Error::Fault("timeval buffer has the wrong size"));
        }
        let mut sec = [0u8; 8];
        let mut usec = [0u8; 8];
        sec.copy_from_slice(&bytes[..8]);
        usec.copy_from_slice(&bytes[8..]);
        Ok(Self {
            sec: i64::from_le_bytes(sec),
            usec: i64::from_le_bytes(usec),
        })
    }

    pub fn write_bytes(&self, out: &mut [u8]) -> Result<()> {
        if out.len() != TIMEVAL_BYTES {
            return Err(Error::Fault("timeval buffer has the wrong size"));
        }
        out[..8].copy_from_slice(&self.sec.to_le_bytes());
        out[8..].copy_from_slice(&self.usec.to_le_bytes());
        Ok(())
    }
}
