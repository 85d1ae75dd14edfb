//! # Kestrel Demo Firmware
//!
//! Exercises the kernel with three tasks spanning the priority range:
//!
//! | Task | Priority | Behavior |
//! |------|----------|----------|
//! | `sampler_task`   | Medium | Produces a reading every 100 ms, signals the semaphore |
//! | `consumer_task`  | High   | Waits on the semaphore, folds readings into a checksum |
//! | `heartbeat_task` | Low    | Bumps a counter every 500 ms |
//!
//! The consumer outranks the sampler, so every signal is consumed on the
//! next scheduling decision after it is raised; the heartbeat fills the
//! gaps; the idle task soaks up whatever is left. A mutex serializes the
//! two writers of the shared checksum word.
//!
//! The firmware body only builds for the Cortex-M4 target; host builds
//! (`cargo test`) get an empty stub so the package still links.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use kestrel::kernel;
    use kestrel::sync::{Mutex, MutexState, Semaphore, Timeout};
    use kestrel::task::Priority;

    /// Readings produced by the sampler, pending consumption.
    static SAMPLES: Semaphore = Semaphore::new(0);

    /// Serializes updates to `CHECKSUM` between sampler and consumer.
    static CHECKSUM_LOCK: Mutex = Mutex::new(MutexState::Released);

    static mut CHECKSUM: u32 = 0;

    /// Medium-priority producer: one reading every 100 ms.
    extern "C" fn sampler_task(seed: usize) -> ! {
        let mut reading = seed as u32;
        loop {
            kernel::delay(100);
            reading = reading.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);

            if CHECKSUM_LOCK.take(Timeout::Ms(50)).is_ok() {
                unsafe { CHECKSUM = CHECKSUM.wrapping_add(reading) };
                CHECKSUM_LOCK.release();
                SAMPLES.signal();
            }
            // A timed-out take drops the reading; the next period retries
            // with a fresh sample.
        }
    }

    /// High-priority consumer: drains one signal per reading.
    extern "C" fn consumer_task(_arg: usize) -> ! {
        let mut consumed: u32 = 0;
        loop {
            if SAMPLES.wait(Timeout::Forever).is_ok() {
                consumed = consumed.wrapping_add(1);
                if CHECKSUM_LOCK.take(Timeout::Forever).is_ok() {
                    unsafe { CHECKSUM ^= consumed };
                    CHECKSUM_LOCK.release();
                }
            }
        }
    }

    /// Low-priority heartbeat: visible liveness at 2 Hz.
    extern "C" fn heartbeat_task(_arg: usize) -> ! {
        let mut beats: u32 = 0;
        loop {
            beats = beats.wrapping_add(1);
            kernel::delay(500);
        }
    }

    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        kernel::init().expect("stack layout rejected");

        kernel::create_task(sampler_task, 0xACE1, Priority::Medium)
            .expect("failed to create sampler_task");
        kernel::create_task(consumer_task, 0, Priority::High)
            .expect("failed to create consumer_task");
        kernel::create_task(heartbeat_task, 0, Priority::Low)
            .expect("failed to create heartbeat_task");

        kernel::start(cp)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
