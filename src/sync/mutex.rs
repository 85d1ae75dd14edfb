//! Two-state busy-wait mutex.

use core::cell::UnsafeCell;

use crate::error::TimeoutError;
use crate::kernel::get_ticks;
use crate::sync::{critical_section, Timeout};

/// Lock state of a [`Mutex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexState {
    /// Free to be taken.
    Released,
    /// Held by some task.
    Taken,
}

/// A spin-held mutual-exclusion flag.
///
/// No ownership is tracked: any task may release a mutex regardless of
/// which task took it, and releasing an already-released mutex is not an
/// error. A waiting `take` spins preemptibly — the caller stays
/// schedulable and other tasks keep running — until the state flips or
/// its deadline passes.
pub struct Mutex {
    state: UnsafeCell<MutexState>,
}

// Safety: the state cell is only read or written inside interrupt-masked
// critical sections, which serialize access against both the tick
// interrupt and (in host tests) other threads.
unsafe impl Sync for Mutex {}

impl Mutex {
    /// A mutex in the requested initial state.
    pub const fn new(initial_state: MutexState) -> Self {
        Self {
            state: UnsafeCell::new(initial_state),
        }
    }

    /// Attempt to take the mutex, spinning for at most `timeout`.
    ///
    /// Each pass first checks the deadline (timed mode only), then
    /// check-and-sets `Released → Taken` atomically with respect to the
    /// timer interrupt. Fails with [`TimeoutError`] once
    /// `get_ticks() >= deadline`; a failed call never retries on its own.
    pub fn take(&self, timeout: Timeout) -> Result<(), TimeoutError> {
        let deadline = timeout.deadline_from(get_ticks());

        loop {
            if let Some(deadline) = deadline {
                if get_ticks() >= deadline {
                    return Err(TimeoutError);
                }
            }

            let acquired = critical_section(|_cs| {
                // Safety: inside the critical section (see Sync impl).
                let state = unsafe { &mut *self.state.get() };
                if *state == MutexState::Released {
                    *state = MutexState::Taken;
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

    /// Release the mutex unconditionally.
    ///
    /// Idempotent; there is no check that the caller is the holder.
    pub fn release(&self) {
        critical_section(|_cs| {
            // Safety: inside the critical section (see Sync impl).
            unsafe { *self.state.get() = MutexState::Released };
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn take_released_succeeds_immediately() {
        let mutex = Mutex::new(MutexState::Released);
        assert_eq!(mutex.take(Timeout::Ms(1_000_000)), Ok(()));
        // Now held: a second taker with an expired budget fails.
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));
    }

    #[test]
    fn zero_timeout_is_already_expired() {
        let mutex = Mutex::new(MutexState::Released);
        // The deadline check runs before the take attempt, so a zero
        // budget times out even on a released mutex.
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));
    }

    #[test]
    fn release_is_idempotent_and_reopens_the_mutex() {
        let mutex = Mutex::new(MutexState::Taken);
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));

        mutex.release();
        mutex.release();
        assert_eq!(mutex.take(Timeout::Ms(1_000_000)), Ok(()));
    }

    #[test]
    fn only_one_take_succeeds_per_release() {
        let mutex = Mutex::new(MutexState::Released);
        assert_eq!(mutex.take(Timeout::Ms(1_000_000)), Ok(()));
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));

        mutex.release();
        assert_eq!(mutex.take(Timeout::Ms(1_000_000)), Ok(()));
        assert_eq!(mutex.take(Timeout::Ms(0)), Err(TimeoutError));
    }

    #[test]
    fn timed_take_fails_once_the_deadline_passes() {
        let mutex = Arc::new(Mutex::new(MutexState::Taken));

        // Stand in for the tick interrupt: advance the shared counter
        // until the spinning taker hits its deadline.
        let ticker = thread::spawn(|| {
            for _ in 0..200 {
                kernel::advance_ticks(1);
                thread::sleep(Duration::from_millis(1));
            }
        });

        let result = mutex.take(Timeout::Ms(50));
        assert_eq!(result, Err(TimeoutError));
        ticker.join().unwrap();
    }

    #[test]
    fn forever_take_waits_out_a_release() {
        let mutex = Arc::new(Mutex::new(MutexState::Taken));
        let holder = Arc::clone(&mutex);

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            holder.release();
        });

        assert_eq!(mutex.take(Timeout::Forever), Ok(()));
        releaser.join().unwrap();
    }
}
