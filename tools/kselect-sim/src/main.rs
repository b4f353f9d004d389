// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! kselect-sim - drive the select engine on a realtime simulated kernel
//!
//! Each subcommand runs one scenario and prints what the selecting task
//! observed. `RUST_LOG=trace` shows the engine's own view.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use kselect::config::{FD_SET_BYTES, TIMEVAL_BYTES};
use kselect::vfs::{pipe, EventStream};
use kselect::{
    sys_select, Direction, FdSet, InterestSets, Kernel, KernelConfig, Scheduler, Task, TickMode,
    TimeVal,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// kselect simulator
#[derive(Parser, Debug)]
#[command(name = "kselect-sim")]
#[command(version)]
#[command(about = "Run select scenarios against a simulated kernel")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Timer interrupt frequency (ticks per second); defaults to
    /// `KSELECT_TIMER_HZ` or 100
    #[arg(long, global = true)]
    hz: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Select with no interest sets: a pure delay
    Delay {
        /// Ticks to sleep
        #[arg(short, long, default_value = "50")]
        ticks: u32,
    },

    /// A writer thread fills a pipe while the main task selects on it
    Pipe {
        /// Ticks before the writer writes
        #[arg(short, long, default_value = "10")]
        delay_ticks: u32,

        /// Select timeout in ticks
        #[arg(short, long, default_value = "100")]
        timeout: u32,
    },

    /// Signal a condition K times without readiness, then make it ready
    Spurious {
        /// Number of spurious signals
        #[arg(short = 'n', long, default_value = "3")]
        count: u32,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = kernel_config(args.hz);
    let kernel = Arc::new(Kernel::new(config).context("failed to start kernel")?);

    match args.mode {
        Mode::Delay { ticks } => run_delay(&kernel, ticks),
        Mode::Pipe {
            delay_ticks,
            timeout,
        } => run_pipe(&kernel, delay_ticks, timeout),
        Mode::Spurious { count } => run_spurious(&kernel, count),
    }
}

/// Environment configuration with the realtime clock every scenario needs.
/// `--hz` wins over `KSELECT_TIMER_HZ`.
fn kernel_config(hz: Option<u32>) -> KernelConfig {
    let config = KernelConfig::from_env().with_tick_mode(TickMode::Realtime);
    match hz {
        Some(hz) => config.with_timer_hz(hz),
        None => config,
    }
}

/// How long a helper thread waits for the selecting task to park.
const BLOCK_WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Wait until at least `tasks` tasks are parked and `min_blocks`
/// suspensions happened, giving up after `limit`.
fn wait_blocked(
    sched: &Scheduler,
    tasks: usize,
    min_blocks: u64,
    limit: Duration,
) -> anyhow::Result<()> {
    let deadline = Instant::now() + limit;
    while sched.blocked_tasks() < tasks || sched.block_count() < min_blocks {
        if Instant::now() >= deadline {
            bail!(
                "selecting task did not block within {:?} (blocks so far: {})",
                limit,
                sched.block_count()
            );
        }
        thread::sleep(Duration::from_micros(200));
    }
    Ok(())
}

fn run_delay(kernel: &Kernel, ticks: u32) -> anyhow::Result<()> {
    let hz = kernel.scheduler().timer_hz();
    println!("=== kselect delay: {} ticks at {} Hz ===\n", ticks, hz);

    let tv = TimeVal::from_ticks(ticks, hz);
    let mut tv_bytes = [0u8; TIMEVAL_BYTES];
    tv.write_bytes(&mut tv_bytes)?;

    let start_tick = kernel.scheduler().now();
    let start = Instant::now();
    let rc = sys_select(kernel, 0, None, None, None, Some(&mut tv_bytes));
    if rc < 0 {
        bail!("sys_select failed with errno {}", -rc);
    }

    let left = TimeVal::from_bytes(&tv_bytes)?;
    println!("ready:     {}", rc);
    println!("ticks:     {}", kernel.scheduler().now() - start_tick);
    println!("elapsed:   {:?}", start.elapsed());
    println!("remaining: {}s {}us", left.sec, left.usec);
    Ok(())
}

fn run_pipe(kernel: &Arc<Kernel>, delay_ticks: u32, timeout: u32) -> anyhow::Result<()> {
    println!(
        "=== kselect pipe: write after {} ticks, timeout {} ===\n",
        delay_ticks, timeout
    );

    let (reader, writer) = pipe(kselect::config::DEFAULT_PIPE_CAPACITY);
    let reader = Arc::new(reader);
    let rfd = kernel.handles().install(reader.clone())?;

    let writer_kernel = Arc::clone(kernel);
    let writer_thread = thread::Builder::new()
        .name("kselect-writer".into())
        .spawn(move || -> anyhow::Result<usize> {
            let sched = writer_kernel.scheduler();
            wait_blocked(sched, 1, 1, BLOCK_WAIT_LIMIT)?;
            sched.sleep(&Task::current(), u64::from(delay_ticks));
            log::info!("[sim] writer woke at tick {}", sched.now());
            Ok(writer.write(b"hello from the writer")?)
        })
        .context("failed to spawn writer")?;

    let mut rfds = vec![0u8; FD_SET_BYTES];
    [rfd].into_iter().collect::<FdSet>().write_bytes(&mut rfds)?;
    let tv = TimeVal::from_ticks(timeout, kernel.scheduler().timer_hz());
    let mut tv_bytes = [0u8; TIMEVAL_BYTES];
    tv.write_bytes(&mut tv_bytes)?;

    let start_tick = kernel.scheduler().now();
    let rc = sys_select(kernel, rfd as i32 + 1, Some(&mut rfds), None, None, Some(&mut tv_bytes));
    let end_tick = kernel.scheduler().now();

    let written = writer_thread
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))?;

    if rc < 0 {
        bail!("sys_select failed with errno {}", -rc);
    }
    let written = written.context("writer failed")?;

    let left = TimeVal::from_bytes(&tv_bytes)?;
    println!("ready:     {}", rc);
    println!("woke at:   tick {} (+{})", end_tick, end_tick - start_tick);
    println!("remaining: {}s {}us", left.sec, left.usec);
    println!("written:   {} bytes, buffered {}", written, reader.available());
    Ok(())
}

fn run_spurious(kernel: &Arc<Kernel>, count: u32) -> anyhow::Result<()> {
    println!("=== kselect spurious: {} spurious signals ===\n", count);

    let event = Arc::new(EventStream::new());
    let fd = kernel.handles().install(event.clone())?;

    let signal_kernel = Arc::clone(kernel);
    let signaler = thread::spawn(move || -> anyhow::Result<()> {
        let sched = signal_kernel.scheduler();
        for round in 1..=u64::from(count) {
            wait_blocked(sched, 1, round, BLOCK_WAIT_LIMIT)?;
            let woken = event.signal(Direction::Read);
            log::info!("[sim] spurious signal {} reached {} waiter(s)", round, woken);
        }
        wait_blocked(sched, 1, u64::from(count) + 1, BLOCK_WAIT_LIMIT)?;
        event.set_ready(Direction::Read, true);
        Ok(())
    });

    let mut sets = InterestSets::new().with(Direction::Read, [fd].into_iter().collect());
    let outcome = kernel.select(fd + 1, &mut sets, None)?;
    signaler
        .join()
        .map_err(|_| anyhow::anyhow!("signaler thread panicked"))?
        .context("signaler failed")?;

    println!("ready:       {}", outcome.ready);
    println!("suspensions: {}", kernel.scheduler().block_count());
    Ok(())
}
