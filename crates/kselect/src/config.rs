// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! kselect configuration.
//!
//! - **Level 1 (Static)**: compile-time limits (handle table width, slot
//!   ceiling, timer frequency default).
//! - **Level 2 (Dynamic)**: [`KernelConfig`], built in code or read from the
//!   environment with [`KernelConfig::from_env`].
//!
//! # Example
//!
//! ```rust
//! use kselect::config::{KernelConfig, TickMode};
//!
//! let config = KernelConfig::default()
//!     .with_timer_hz(1000)
//!     .with_tick_mode(TickMode::Manual);
//! assert_eq!(config.tick_period().as_millis(), 1);
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

// =======================================================================
// Static limits
// =======================================================================

/// Size of the handle table, and width of every interest set.
pub const MAX_HANDLES: usize = 1024;

/// Default timer interrupt frequency (ticks per second).
pub const DEFAULT_TIMER_HZ: u32 = 100;

/// Ceiling on wait slots per call: one per handle and direction.
pub const MAX_WAIT_SLOTS: usize = 3 * MAX_HANDLES;

/// Longest timeout a single select call can sleep, in ticks.
pub const MAX_TIMEOUT_TICKS: u32 = u32::MAX;

/// Encoded size of an interest set at the syscall boundary.
pub const FD_SET_BYTES: usize = MAX_HANDLES / 8;

/// Encoded size of a timeval at the syscall boundary.
pub const TIMEVAL_BYTES: usize = 16;

/// Default capacity of a pipe ring buffer, in bytes.
pub const DEFAULT_PIPE_CAPACITY: usize = 4096;

const ENV_TIMER_HZ: &str = "KSELECT_TIMER_HZ";
const ENV_MAX_WAIT_SLOTS: &str = "KSELECT_MAX_WAIT_SLOTS";
const ENV_TICK_MODE: &str = "KSELECT_TICK_MODE";

// =======================================================================
// Runtime configuration
// =======================================================================

/// How the scheduler clock advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Ticks only advance through `Scheduler::tick` / `Scheduler::advance`.
    Manual,
    /// A background thread ticks the clock every `1 / timer_hz` seconds.
    Realtime,
}

impl TickMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(TickMode::Manual),
            "realtime" | "real" => Some(TickMode::Realtime),
            _ => None,
        }
    }
}

/// Runtime configuration for a [`crate::Kernel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Timer interrupt frequency; must divide one million.
    pub timer_hz: u32,
    /// Upper bound on wait slots a single call may allocate.
    pub max_wait_slots: usize,
    /// Clock driver.
    pub tick_mode: TickMode,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            timer_hz: DEFAULT_TIMER_HZ,
            max_wait_slots: MAX_WAIT_SLOTS,
            tick_mode: TickMode::Realtime,
        }
    }
}

impl KernelConfig {
    /// Defaults with a manually driven clock (deterministic tests).
    #[must_use]
    pub fn manual() -> Self {
        Self::default().with_tick_mode(TickMode::Manual)
    }

    #[must_use]
    pub fn with_timer_hz(mut self, hz: u32) -> Self {
        self.timer_hz = hz;
        self
    }

    #[must_use]
    pub fn with_max_wait_slots(mut self, slots: usize) -> Self {
        self.max_wait_slots = slots;
        self
    }

    #[must_use]
    pub fn with_tick_mode(mut self, mode: TickMode) -> Self {
        self.tick_mode = mode;
        self
    }

    /// Defaults overridden by `KSELECT_TIMER_HZ`, `KSELECT_MAX_WAIT_SLOTS`
    /// and `KSELECT_TICK_MODE`. Unparsable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TIMER_HZ) {
            match raw.trim().parse::<u32>() {
                Ok(hz) => config.timer_hz = hz,
                Err(_) => log::warn!("[config] ignoring {}={:?}", ENV_TIMER_HZ, raw),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_WAIT_SLOTS) {
            match raw.trim().parse::<usize>() {
                Ok(slots) => config.max_wait_slots = slots,
                Err(_) => log::warn!("[config] ignoring {}={:?}", ENV_MAX_WAIT_SLOTS, raw),
            }
        }

        if let Some(raw) = lookup(ENV_TICK_MODE) {
            match TickMode::parse(&raw) {
                Some(mode) => config.tick_mode = mode,
                None => log::warn!("[config] ignoring {}={:?}", ENV_TICK_MODE, raw),
            }
        }

        config
    }

    /// Check the configuration before a kernel is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.timer_hz == 0 || 1_000_000 % self.timer_hz != 0 {
            return Err(Error::InvalidArgument(format!(
                "timer_hz {} must be a non-zero divisor of 1000000",
                self.timer_hz
            )));
        }
        if self.max_wait_slots == 0 || self.max_wait_slots > MAX_WAIT_SLOTS {
            return Err(Error::InvalidArgument(format!(
                "max_wait_slots {} must be in 1..={}",
                self.max_wait_slots, MAX_WAIT_SLOTS
            )));
        }
        Ok(())
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.timer_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_period(), Duration::from_millis(10));
    }

    #[test]
    fn env_overrides_apply() {
        let config = KernelConfig::from_lookup(lookup_from(&[
            ("KSELECT_TIMER_HZ", "1000"),
            ("KSELECT_MAX_WAIT_SLOTS", "64"),
            ("KSELECT_TICK_MODE", "Manual"),
        ]));
        assert_eq!(config.timer_hz, 1000);
        assert_eq!(config.max_wait_slots, 64);
        assert_eq!(config.tick_mode, TickMode::Manual);
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let config = KernelConfig::from_lookup(lookup_from(&[
            ("KSELECT_TIMER_HZ", "fast"),
            ("KSELECT_TICK_MODE", "sometimes"),
        ]));
        assert_eq!(config, KernelConfig::default());
    }

    #[test]
    fn validate_rejects_odd_frequencies() {
        assert!(KernelConfig::default().with_timer_hz(0).validate().is_err());
        assert!(KernelConfig::default().with_timer_hz(7).validate().is_err());
        assert!(KernelConfig::default().with_timer_hz(250).validate().is_ok());
        assert!(KernelConfig::default()
            .with_max_wait_slots(MAX_WAIT_SLOTS + 1)
            .validate()
            .is_err());
    }
}
