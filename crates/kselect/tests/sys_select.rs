// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unwrap_used)] // test scaffolding
#![allow(clippy::cast_possible_wrap)] // errno comparisons

//! Syscall boundary: byte buffers in, errno-style results out.

mod common;

use common::{install_events, manual_kernel, on_block};
use kselect::config::{FD_SET_BYTES, TIMEVAL_BYTES};
use kselect::{sys_select, Direction, FdSet, TimeVal};
use std::sync::Arc;

fn encode_set(fds: &[usize]) -> Vec<u8> {
    let mut bytes = vec![0u8; FD_SET_BYTES];
    common::fd_set(fds).write_bytes(&mut bytes).unwrap();
    bytes
}

fn encode_tv(tv: TimeVal) -> [u8; TIMEVAL_BYTES] {
    let mut bytes = [0u8; TIMEVAL_BYTES];
    tv.write_bytes(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_remaining_time_is_written_back() {
    let kernel = manual_kernel();
    let events = install_events(&kernel, 2);

    // 100 Hz: half a second is 50 ticks.
    let late = Arc::clone(&events[1]);
    let driver = on_block(&kernel, move |k| {
        k.scheduler().advance(10);
        late.set_ready(Direction::Read, true);
    });

    let mut rfds = encode_set(&[0, 1]);
    let mut tv = encode_tv(TimeVal::new(0, 500_000));
    let rc = sys_select(&kernel, 2, Some(&mut rfds), None, None, Some(&mut tv));
    driver.join().unwrap();

    assert_eq!(rc, 1);
    assert_eq!(
        FdSet::from_bytes(&rfds).unwrap().iter().collect::<Vec<_>>(),
        vec![1]
    );
    assert_eq!(TimeVal::from_bytes(&tv).unwrap(), TimeVal::new(0, 400_000));
}

#[test]
fn test_expired_timeout_writes_zero() {
    let kernel = manual_kernel();
    install_events(&kernel, 1);

    let driver = on_block(&kernel, |k| k.scheduler().advance(100));

    let mut rfds = encode_set(&[0]);
    let mut tv = encode_tv(TimeVal::new(1, 0));
    let rc = sys_select(&kernel, 1, Some(&mut rfds), None, None, Some(&mut tv));
    driver.join().unwrap();

    assert_eq!(rc, 0);
    assert!(FdSet::from_bytes(&rfds).unwrap().is_empty());
    assert_eq!(TimeVal::from_bytes(&tv).unwrap(), TimeVal::default());
}

#[test]
fn test_errno_mapping() {
    let kernel = manual_kernel();
    install_events(&kernel, 1);
    let mut zero = encode_tv(TimeVal::default());

    assert_eq!(
        sys_select(&kernel, -3, None, None, None, Some(&mut zero)),
        -(libc::EINVAL as isize)
    );

    let mut efds = encode_set(&[0, 2]);
    let rc = sys_select(&kernel, 3, None, None, Some(&mut efds), Some(&mut zero));
    assert_eq!(rc, -(libc::EBADF as isize));

    let mut truncated = vec![0u8; FD_SET_BYTES - 1];
    let rc = sys_select(&kernel, 1, None, Some(&mut truncated), None, Some(&mut zero));
    assert_eq!(rc, -(libc::EFAULT as isize));
}

#[test]
fn test_null_timeval_with_nothing_to_wait_on_returns_at_once() {
    let kernel = manual_kernel();
    let rc = sys_select(&kernel, 0, None, None, None, None);
    assert_eq!(rc, 0);
    assert_eq!(kernel.scheduler().block_count(), 0);
}
