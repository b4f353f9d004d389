// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding

use super::{Scheduler, Task, WokenBy};
use crate::config::KernelConfig;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn current_task_is_stable_per_thread() {
    let a = Task::current();
    let b = Task::current();
    assert_eq!(a.id(), b.id());

    let other = thread::spawn(|| Task::current().id()).join().unwrap();
    assert_ne!(a.id(), other);
}

#[test]
fn timer_fires_at_deadline() {
    let sched = Scheduler::new(100);
    let task = Task::current();

    sched.arm_timer(&task, 3);
    assert_eq!(sched.pending_timers(), 1);
    assert_eq!(sched.advance(2), 0);
    assert!(task.has_timer());
    assert_eq!(sched.tick(), 1);
    assert!(!task.has_timer());

    assert_eq!(sched.block_until_woken(&task), WokenBy::Timeout);
}

#[test]
fn cancel_returns_remaining_ticks() {
    let sched = Scheduler::new(100);
    let task = Task::current();

    sched.arm_timer(&task, 50);
    sched.advance(10);
    assert_eq!(sched.cancel_timer(&task), 40);
    assert_eq!(sched.pending_timers(), 0);
    assert_eq!(sched.cancel_timer(&task), 0);
}

#[test]
fn rearm_replaces_pending_timer() {
    let sched = Scheduler::new(100);
    let task = Task::current();

    sched.arm_timer(&task, 5);
    sched.arm_timer(&task, 20);
    assert_eq!(sched.pending_timers(), 1);
    assert_eq!(sched.advance(5), 0);
    assert_eq!(sched.cancel_timer(&task), 15);
}

#[test]
fn cancel_after_fire_discards_stale_timeout() {
    let sched = Scheduler::new(100);
    let task = Task::current();

    sched.arm_timer(&task, 1);
    sched.tick();
    assert_eq!(sched.cancel_timer(&task), 0);

    // The timeout reason went away with the cancel.
    assert!(task.wake(WokenBy::Condition));
    assert_eq!(sched.block_until_woken(&task), WokenBy::Condition);
}

#[test]
fn timeout_dominates_pending_condition() {
    let task = Task::current();
    task.reset_wake_reason();

    assert!(task.wake(WokenBy::Condition));
    assert!(!task.wake(WokenBy::Condition));
    assert!(task.wake(WokenBy::Timeout));
    assert!(!task.wake(WokenBy::Condition));

    let sched = Scheduler::new(100);
    assert_eq!(sched.block_until_woken(&task), WokenBy::Timeout);
}

#[test]
fn wake_before_block_is_not_lost() {
    let sched = Scheduler::new(100);
    let task = Task::current();
    task.reset_wake_reason();

    task.wake(WokenBy::Condition);
    assert_eq!(sched.block_until_woken(&task), WokenBy::Condition);
}

#[test]
fn cross_thread_wake_unparks_blocked_task() {
    let sched = Scheduler::new(100);
    let (tx, rx) = crossbeam::channel::unbounded();

    let worker_sched = sched.clone();
    let worker = thread::spawn(move || {
        let me = Task::current();
        tx.send(me.clone()).unwrap();
        worker_sched.block_until_woken(&me)
    });

    let task = rx.recv().unwrap();
    wait_for(|| task.is_blocked());
    assert_eq!(sched.blocked_tasks(), 1);

    task.wake(WokenBy::Condition);
    assert_eq!(worker.join().unwrap(), WokenBy::Condition);
    assert_eq!(sched.blocked_tasks(), 0);
}

#[test]
fn sleep_ignores_condition_wakes() {
    let sched = Scheduler::new(100);
    let (tx, rx) = crossbeam::channel::unbounded();

    let worker_sched = sched.clone();
    let worker = thread::spawn(move || {
        tx.send(Task::current()).unwrap();
        worker_sched.sleep(&Task::current(), 20);
        worker_sched.now()
    });

    let task = rx.recv().unwrap();
    wait_for(|| task.is_blocked());

    task.wake(WokenBy::Condition);
    wait_for(|| sched.block_count() >= 2);
    sched.advance(19);
    assert!(!worker.is_finished());

    sched.tick();
    assert_eq!(worker.join().unwrap(), 20);
}

#[test]
fn realtime_ticker_advances_clock() {
    let config = KernelConfig::default().with_timer_hz(1000);
    let sched = Scheduler::with_config(&config).unwrap();
    assert_eq!(sched.timer_hz(), 1000);

    wait_for(|| sched.now() >= 5);
    drop(sched);
}
