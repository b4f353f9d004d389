// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::MultiWaiter;
use crate::error::Error;
use crate::kcond::KCond;
use crate::sched::{Scheduler, Task, WokenBy};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn waiter(sched: &Scheduler, slots: usize) -> MultiWaiter {
    MultiWaiter::allocate(sched, Task::current(), slots, 64).expect("allocate")
}

#[test]
fn allocate_above_ceiling_is_out_of_memory() {
    let sched = Scheduler::new(100);
    let err = MultiWaiter::allocate(&sched, Task::current(), 65, 64).unwrap_err();
    assert!(matches!(err, Error::OutOfMemory));
}

#[test]
fn bind_registers_on_condition() {
    let sched = Scheduler::new(100);
    let a = KCond::shared();
    let b = KCond::shared();

    let mut w = waiter(&sched, 2);
    w.bind(0, &a);
    w.bind(1, &b);

    assert_eq!(w.len(), 2);
    assert_eq!(w.bound(), 2);
    assert_eq!(a.waiter_count(), 1);
    assert_eq!(b.waiter_count(), 1);
}

#[test]
fn release_unlinks_every_slot_and_is_idempotent() {
    let sched = Scheduler::new(100);
    let a = KCond::shared();
    let b = KCond::shared();

    let mut w = waiter(&sched, 2);
    w.bind(0, &a);
    w.bind(1, &b);

    w.release();
    assert!(w.is_released());
    assert_eq!(a.waiter_count(), 0);
    assert_eq!(b.waiter_count(), 0);

    w.release();
    assert_eq!(a.signal_all(), 0);
}

#[test]
fn drop_releases_bindings() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();

    {
        let mut w = waiter(&sched, 1);
        w.bind(0, &cond);
        assert_eq!(cond.waiter_count(), 1);
    }

    assert_eq!(cond.waiter_count(), 0);
    assert_eq!(cond.signal_all(), 0);
}

#[test]
fn partially_bound_waiter_releases_cleanly() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();

    let mut w = waiter(&sched, 3);
    w.bind(0, &cond);
    drop(w);

    assert_eq!(cond.waiter_count(), 0);
}

#[test]
fn signal_before_block_wakes_immediately() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();

    let mut w = waiter(&sched, 1);
    w.bind(0, &cond);
    assert_eq!(cond.signal_all(), 1);

    assert_eq!(w.block_until_woken(), WokenBy::Condition);
    assert_eq!(w.fired_slots(), vec![0]);
    assert!(w.fired_slots().is_empty());
}

#[test]
fn fired_slots_identify_the_signaled_conditions() {
    let sched = Scheduler::new(100);
    let conds: Vec<Arc<KCond>> = (0..4).map(|_| KCond::shared()).collect();

    let mut w = waiter(&sched, conds.len());
    for (i, cond) in conds.iter().enumerate() {
        w.bind(i, cond);
    }

    conds[3].signal_all();
    conds[1].signal_one();

    assert_eq!(w.block_until_woken(), WokenBy::Condition);
    assert_eq!(w.fired_slots(), vec![1, 3]);
}

#[test]
fn signal_from_another_thread_wakes_blocked_waiter() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();

    let mut w = waiter(&sched, 1);
    w.bind(0, &cond);

    let signaler_cond = Arc::clone(&cond);
    let signaler_sched = sched.clone();
    let signaler = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while signaler_sched.blocked_tasks() == 0 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        signaler_cond.signal_all()
    });

    assert_eq!(w.block_until_woken(), WokenBy::Condition);
    assert_eq!(signaler.join().unwrap(), 1);
    assert_eq!(w.fired_slots(), vec![0]);
}

#[test]
fn timer_wakes_waiter_with_timeout() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();
    let task = Task::current();

    let mut w = waiter(&sched, 1);
    w.bind(0, &cond);

    sched.arm_timer(&task, 2);
    sched.advance(2);

    assert_eq!(w.block_until_woken(), WokenBy::Timeout);
    assert!(!w.has_fired());
}

#[test]
fn stale_reason_from_earlier_wait_is_cleared() {
    let sched = Scheduler::new(100);
    let task = Task::current();
    task.wake(WokenBy::Condition);

    let cond = KCond::shared();
    let mut w = waiter(&sched, 1);
    w.bind(0, &cond);

    sched.arm_timer(&task, 1);
    sched.tick();
    assert_eq!(w.block_until_woken(), WokenBy::Timeout);
}

#[test]
#[should_panic(expected = "bound twice")]
fn double_bind_is_a_contract_violation() {
    let sched = Scheduler::new(100);
    let cond = KCond::shared();

    let mut w = waiter(&sched, 2);
    w.bind(0, &cond);
    w.bind(0, &cond);
}
