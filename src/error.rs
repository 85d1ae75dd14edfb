//! # Error Types
//!
//! Every fallible kernel operation reports one of the small, copyable
//! error values below. There is no retry policy anywhere in the kernel:
//! a timeout is surfaced once and callers that need retry loop explicitly.

use core::fmt;

/// Errors reported by kernel lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// `create_task` was called after every task slot had been consumed.
    /// Allocation is monotonic and one-way; slots are never reused.
    CapacityExceeded,
    /// `init` rejected the stack layout parameters (region size not a
    /// positive multiple of 8, or too small for one context frame).
    InvalidStackLayout,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::CapacityExceeded => f.write_str("task table is full"),
            KernelError::InvalidStackLayout => f.write_str("invalid task stack layout"),
        }
    }
}

/// A timed `Mutex::take` or `Semaphore::wait` reached its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError;

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("wait deadline reached")
    }
}
