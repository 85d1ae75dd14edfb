//! Counting busy-wait semaphore.

use core::cell::UnsafeCell;

use crate::error::TimeoutError;
use crate::kernel::get_ticks;
use crate::sync::{critical_section, Timeout};

/// A counting semaphore with no upper bound.
///
/// `signal` increments the count; `wait` spins preemptibly until the
/// count is positive (or its deadline passes) and decrements it. The
/// check and the decrement happen in one interrupt-masked region, so the
/// count never goes below zero even when the waiter is preempted between
/// passes.
pub struct Semaphore {
    count: UnsafeCell<u32>,
}

// Safety: the count cell is only read or written inside interrupt-masked
// critical sections, which serialize access against both the tick
// interrupt and (in host tests) other threads.
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// A semaphore holding `initial_count` signals.
    pub const fn new(initial_count: u32) -> Self {
        Self {
            count: UnsafeCell::new(initial_count),
        }
    }

    /// Increment the count. Wraps silently at `u32::MAX`; bounding the
    /// count is the caller's contract, not the semaphore's.
    pub fn signal(&self) {
        critical_section(|_cs| {
            // Safety: inside the critical section (see Sync impl).
            let count = unsafe { &mut *self.count.get() };
            *count = count.wrapping_add(1);
        });
    }

    /// Decrement the count, spinning for at most `timeout` while it is
    /// zero. Fails with [`TimeoutError`] once `get_ticks() >= deadline`;
    /// a failed call decrements nothing.
    pub fn wait(&self, timeout: Timeout) -> Result<(), TimeoutError> {
        let deadline = timeout.deadline_from(get_ticks());

        loop {
            if let Some(deadline) = deadline {
                if get_ticks() >= deadline {
                    return Err(TimeoutError);
                }
            }

            let acquired = critical_section(|_cs| {
                // Safety: inside the critical section (see Sync impl).
                let count = unsafe { &mut *self.count.get() };
                if *count > 0 {
                    *count -= 1;
                    true
                } else {
                    false
                }
            });
            if acquired {
                return Ok(());
            }

            core::hint::spin_loop();
        }
    }

    /// Current count, read atomically with respect to the timer interrupt.
    pub fn count(&self) -> u32 {
        critical_section(|_cs| {
            // Safety: inside the critical section (see Sync impl).
            unsafe { *self.count.get() }
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_consumes_the_initial_count() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.wait(Timeout::Ms(1_000_000)), Ok(()));
        assert_eq!(sem.wait(Timeout::Ms(1_000_000)), Ok(()));
        assert_eq!(sem.count(), 0);
        // Exhausted: an expired budget fails and the count stays at zero.
        assert_eq!(sem.wait(Timeout::Ms(0)), Err(TimeoutError));
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn signal_then_wait_leaves_the_count_unchanged() {
        let sem = Semaphore::new(3);
        for _ in 0..4 {
            sem.signal();
            assert_eq!(sem.wait(Timeout::Ms(1_000_000)), Ok(()));
        }
        assert_eq!(sem.count(), 3);
    }

    #[test]
    fn signal_accumulates() {
        let sem = Semaphore::new(0);
        sem.signal();
        sem.signal();
        sem.signal();
        assert_eq!(sem.count(), 3);
    }

    #[test]
    fn wait_on_zero_count_times_out_without_decrementing() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.wait(Timeout::Ms(0)), Err(TimeoutError));
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn forever_wait_picks_up_a_signal() {
        let sem = Arc::new(Semaphore::new(0));
        let producer = Arc::clone(&sem);

        let signaller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.signal();
        });

        assert_eq!(sem.wait(Timeout::Forever), Ok(()));
        assert_eq!(sem.count(), 0);
        signaller.join().unwrap();
    }
}
