// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the select engine, the handle table and the syscall
//! boundary.

/// Errors returned by kselect operations.
///
/// Every variant maps to a negative errno through [`Error::errno`], which is
/// what [`crate::abi::sys_select`] hands back to its caller.
///
/// # Example
///
/// ```rust
/// use kselect::{Error, Kernel, KernelConfig, InterestSets};
///
/// let kernel = Kernel::new(KernelConfig::manual()).unwrap();
/// let mut sets = InterestSets::new();
///
/// match kernel.select(4096, &mut sets, Some(0)) {
///     Err(Error::InvalidArgument(msg)) => println!("rejected: {}", msg),
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// Handle-count bound, handle index or timeout value out of range.
    InvalidArgument(String),
    /// A handle in an interest set does not resolve to an open stream.
    BadHandle(usize),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Wait state could not be allocated.
    OutOfMemory,
    /// The handle table has no free slot left.
    TooManyHandles,

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// Non-blocking stream operation cannot make progress right now.
    WouldBlock,
    /// Write to a pipe whose read end is closed.
    BrokenPipe,

    // ========================================================================
    // Boundary Errors
    // ========================================================================
    /// Caller-supplied buffer could not be copied in or out.
    Fault(&'static str),
}

impl Error {
    /// Negative errno value for the syscall boundary.
    #[must_use]
    pub fn errno(&self) -> i32 {
        let code = match self {
            Error::InvalidArgument(_) => libc::EINVAL,
            Error::BadHandle(_) => libc::EBADF,
            Error::OutOfMemory => libc::ENOMEM,
            Error::TooManyHandles => libc::EMFILE,
            Error::WouldBlock => libc::EAGAIN,
            Error::BrokenPipe => libc::EPIPE,
            Error::Fault(_) => libc::EFAULT,
        };
        -code
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::BadHandle(fd) => write!(f, "Bad handle: {} is not open", fd),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::TooManyHandles => write!(f, "Handle table full"),
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::BrokenPipe => write!(f, "Broken pipe"),
            Error::Fault(what) => write!(f, "Bad address: {}", what),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
