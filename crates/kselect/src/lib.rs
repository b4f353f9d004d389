// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # kselect - multiplexed readiness wait
//!
//! A `select(2)`-style primitive for a small preemptive kernel, simulated on
//! host threads: a task blocks until any of up to three interest sets
//! (read / write / exception) has a ready handle, or until a timeout in timer
//! ticks expires.
//!
//! ## Quick Start
//!
//! ```rust
//! use kselect::vfs::{pipe, Direction};
//! use kselect::{FdSet, InterestSets, Kernel, KernelConfig};
//! use std::sync::Arc;
//!
//! let kernel = Kernel::new(KernelConfig::manual()).unwrap();
//! let (reader, writer) = pipe(64);
//! let rfd = kernel.handles().install(Arc::new(reader)).unwrap();
//!
//! writer.write(b"hello").unwrap();
//!
//! let mut sets = InterestSets::new().with(Direction::Read, [rfd].into_iter().collect::<FdSet>());
//! let outcome = kernel.select(rfd + 1, &mut sets, Some(0)).unwrap();
//! assert_eq!(outcome.ready, 1);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  abi::sys_select      fd_set / timeval bytes <-> engine     |
//! +-------------------------------------------------------------+
//! |  select::SelectEngine validate, bind, block, re-check       |
//! |    TimeoutController  arm once, cancel on exit              |
//! +-------------------------------------------------------------+
//! |  waiter::MultiWaiter  slot table <-> kcond::KCond hooks     |
//! +-------------------------------------------------------------+
//! |  sched::Scheduler     tasks, tick clock, one-shot timers    |
//! |  vfs::HandleTable     streams exposing readiness + conds    |
//! +-------------------------------------------------------------+
//! ```

pub mod abi;
pub mod config;
pub mod error;
pub mod kcond;
pub mod kernel;
pub mod sched;
pub mod select;
pub mod vfs;
pub mod waiter;

pub use abi::{sys_select, FdSet, TimeVal};
pub use config::{KernelConfig, TickMode};
pub use error::{Error, Result};
pub use kcond::KCond;
pub use kernel::Kernel;
pub use sched::{Scheduler, Task, WokenBy};
pub use select::{InterestSets, SelectEngine, SelectOutcome};
pub use vfs::{Direction, HandleTable, Stream};
pub use waiter::MultiWaiter;
