//! # Synchronization Primitives
//!
//! Interrupt-safe critical sections plus the two inter-task primitives
//! built on them: a two-state [`Mutex`] and a counting [`Semaphore`].
//!
//! Both primitives follow the same busy-wait-with-timeout protocol: the
//! waiting task computes a deadline from the shared tick counter (or
//! skips it for [`Timeout::Forever`]), then spins, re-attempting the
//! masked check-and-mutate until it succeeds or the deadline is reached.
//! The waiter keeps its CPU slot the whole time — it is preempted and
//! resumed by the scheduler like any other task, never parked on a wait
//! queue. There is no priority inheritance; a waiter spinning on a
//! lower-priority holder burns its full round-robin slice each cycle.

use critical_section::CriticalSection;

mod mutex;
mod semaphore;

pub use mutex::{Mutex, MutexState};
pub use semaphore::Semaphore;

/// Execute a closure within a critical section (interrupts masked).
///
/// This is the primary mechanism for safely accessing state shared with
/// the tick interrupt. Keep the enclosed region short and branch-free —
/// it bounds the kernel's interrupt latency.
///
/// On the Cortex-M4 target the implementation is the `cortex-m` crate's
/// single-core PRIMASK section; host unit tests get the `std` fallback.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection) -> R,
{
    critical_section::with(f)
}

/// How long a `take`/`wait` may spin before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Spin until the operation succeeds; no deadline is computed or
    /// checked, so the tick counter may wrap freely underneath.
    Forever,
    /// Fail with a timeout once the tick counter reaches
    /// `ticks-at-entry + ms`. `Ms(0)` is already expired on entry.
    Ms(u32),
}

impl Timeout {
    /// Absolute deadline in ticks, or `None` in forever mode.
    pub(crate) fn deadline_from(self, now: u32) -> Option<u32> {
        match self {
            Timeout::Forever => None,
            Timeout::Ms(ms) => Some(now.wrapping_add(ms)),
        }
    }
}
