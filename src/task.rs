//! # Task Model
//!
//! Defines the task control block and the fixed priority levels. A TCB is
//! owned exclusively by the scheduler's fixed array — it is never copied,
//! only referenced by its index — and carries the intrusive link that
//! threads it into a ready queue.

use crate::config::THREAD_STACK_SIZE;

// ---------------------------------------------------------------------------
// Priorities
// ---------------------------------------------------------------------------

/// Scheduling priority of a task. Immutable after creation — there is no
/// priority inheritance or boosting.
///
/// Numerically higher values are more urgent. `Idle` is the lowest level
/// and is reserved for the idle task, which the scheduler falls back to
/// when nothing else is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    /// Reserved for the idle task in slot 0.
    Idle = 0,
    /// Background work.
    Low = 1,
    /// Ordinary application work.
    Medium = 2,
    /// Latency-sensitive work; preempts everything below it.
    High = 3,
}

impl Priority {
    /// Map a ready-mask bit index back to its priority level.
    pub const fn from_index(index: u32) -> Option<Priority> {
        match index {
            0 => Some(Priority::Idle),
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            _ => None,
        }
    }

    /// The ready-mask bit for this level.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

/// A task entry function. Receives the argument registered at creation in
/// its first parameter (the bootstrap places it in R0 of the synthetic
/// exception frame) and never returns — there is no task exit path.
pub type TaskEntry = extern "C" fn(arg: usize) -> !;

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block — the per-task metadata record.
///
/// One TCB exists per slot in the scheduler's fixed array; the slot index
/// is the task's stable id. A TCB is linked into exactly one ready queue
/// whenever it is not the currently-executing task (the idle task, which
/// is permanently linked, is the single exception).
pub struct Tcb {
    /// Stable task identifier; also the index into the TCB array.
    pub id: usize,

    /// Lowest usable address of this task's private stack region.
    /// Fixed by `init()`, never changes.
    pub stack_base: usize,

    /// Saved process stack pointer while the task is *not* running.
    /// Written by the task bootstrap at creation and by the context-switch
    /// handler on switch-out; read by the handler on switch-in.
    pub stack_top: *mut u32,

    /// Scheduling priority. Immutable after creation.
    pub priority: Priority,

    /// Intrusive ready-queue link. Meaningful only while the TCB is
    /// linked into a queue; `None` otherwise.
    pub next: Option<usize>,
}

impl Tcb {
    /// An unallocated slot. Used to initialize the scheduler's array.
    pub const EMPTY: Tcb = Tcb {
        id: 0,
        stack_base: 0,
        stack_top: core::ptr::null_mut(),
        priority: Priority::Idle,
        next: None,
    };

    /// One past the highest address of this task's stack region.
    #[inline]
    pub fn stack_limit(&self) -> usize {
        self.stack_base + THREAD_STACK_SIZE
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(Priority::Idle < Priority::Low);
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn priority_bit_and_index_round_trip() {
        for (i, p) in [
            Priority::Idle,
            Priority::Low,
            Priority::Medium,
            Priority::High,
        ]
        .into_iter()
        .enumerate()
        {
            assert_eq!(p.bit(), 1 << i);
            assert_eq!(Priority::from_index(i as u32), Some(p));
        }
        assert_eq!(Priority::from_index(4), None);
    }

    #[test]
    fn empty_slot_is_unlinked() {
        let tcb = Tcb::EMPTY;
        assert_eq!(tcb.next, None);
        assert!(tcb.stack_top.is_null());
        assert_eq!(tcb.stack_limit(), THREAD_STACK_SIZE);
    }
}
