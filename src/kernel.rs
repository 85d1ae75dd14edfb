//! # Kernel
//!
//! Top-level kernel lifecycle and the public API surface for tasks.
//!
//! The kernel owns the single global [`Scheduler`] instance, the
//! monotonic tick counter, and the glue between the port layer's
//! interrupt handlers and the scheduling decision. All task-side entry
//! points wrap their scheduler access in a critical section; the tick
//! path runs at the highest exception priority and needs none.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Lay out stacks, install idle task,
//!         │                           program exception priorities
//!         ├─► kernel::create_task() ← Register tasks (×N)
//!         └─► kernel::start()       ← No return: the caller's context
//!               │                      becomes the idle task
//!               ├─► Mask interrupts, configure SysTick
//!               └─► Switch thread mode onto the idle process stack
//!                   and fall into the idle loop
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch;
use crate::config::SCHED_INTERVAL_TICKS;
use crate::error::KernelError;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::{Priority, TaskEntry};

// ---------------------------------------------------------------------------
// Global kernel state
// ---------------------------------------------------------------------------

/// The global scheduler instance.
///
/// # Safety
/// Accessed via `SCHEDULER_PTR`, which is set during `init()`. All access
/// goes through critical sections or the tick handler (where interrupts
/// are already serialized by priority).
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler for the arch layer's PendSV
/// helpers, which cannot easily hold references.
///
/// # Safety
/// Set once during `init()`, read from ISR context afterward.
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Monotonic millisecond counter, incremented once per timer interrupt.
/// Single-word and relaxed: any task or primitive may read it without
/// further synchronization.
static TICKS: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel: lay out the per-task stack regions, install
/// the idle task in slot 0, program the two exception priorities, and
/// publish the scheduler pointer for ISR access. Must be called exactly
/// once, before any other kernel function.
///
/// Fails with [`KernelError::InvalidStackLayout`] if the configured
/// stack parameters cannot hold a context frame.
pub fn init() -> Result<(), KernelError> {
    unsafe {
        SCHEDULER = Scheduler::new();
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
        (*SCHEDULER_PTR).init()?;
    }
    arch::set_exception_priorities();
    Ok(())
}

/// Register a task with the scheduler.
///
/// `entry` starts executing with `arg` in its first parameter the first
/// time the task is switched in. The task becomes ready immediately;
/// call before [`start`]. Fails with [`KernelError::CapacityExceeded`]
/// once the fixed task table is full — allocation is one-way, slots are
/// never reused.
pub fn create_task(
    entry: TaskEntry,
    arg: usize,
    priority: Priority,
) -> Result<usize, KernelError> {
    sync::critical_section(|_cs| unsafe {
        (*SCHEDULER_PTR).create_task(entry, arg, priority)
    })
}

/// Start multitasking. **Does not return.**
///
/// Configures the SysTick timer and hands the calling context over to
/// the idle task: thread mode switches onto the idle task's process
/// stack, interrupts are re-enabled, and the caller becomes the idle
/// loop. From the first tick onward the system is fully preemptive.
///
/// `init()` must have been called. With zero tasks created the idle loop
/// simply runs forever — the scheduler's fast path never arms a switch.
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    // Nothing may preempt between here and the idle hand-off: a tick
    // taken before the process stack exists would save garbage.
    cortex_m::interrupt::disable();

    arch::configure_systick(&mut core_peripherals.SYST);

    let idle_sp = unsafe { (*SCHEDULER_PTR).idle_stack_top() };
    unsafe { arch::become_idle(idle_sp, idle_main) }
}

/// The idle task: the permanent fallback occupying slot 0. Sleeps until
/// the next interrupt; every wakeup is a chance for the tick handler to
/// schedule real work.
extern "C" fn idle_main(_arg: usize) -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

/// Read the monotonic millisecond counter.
#[inline]
pub fn get_ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

/// Busy-wait until the tick counter has advanced by `ms`.
///
/// The wait spins and stays schedulable — the scheduler preempts and
/// resumes the caller normally, so higher- and equal-priority tasks keep
/// running underneath. Wrap-safe.
pub fn delay(ms: u32) {
    let start = get_ticks();
    while get_ticks().wrapping_sub(start) < ms {
        core::hint::spin_loop();
    }
}

/// Run the scheduling decision immediately, out-of-band from the timer,
/// and arm a context switch if one was decided. The caller keeps its
/// ready state — if it is still the best choice it simply continues.
pub fn yield_now() {
    let pend = sync::critical_section(|_cs| unsafe {
        if SCHEDULER_PTR.is_null() {
            return false;
        }
        let sched = &mut *SCHEDULER_PTR;
        sched.decide();
        sched.take_switch_pending()
    });
    if pend {
        arch::pend_context_switch();
    }
}

/// The periodic tick callback, invoked by the port layer's SysTick
/// handler at `TICK_HZ`. Advances the counter and, every
/// `SCHED_INTERVAL_TICKS` ticks, runs the scheduling decision and arms
/// PendSV if a switch was decided.
///
/// Must only be invoked from the tick interrupt (or, on the host, from a
/// single test thread): it touches the scheduler without masking,
/// relying on the tick handler's top exception priority.
pub fn tick() {
    let now = TICKS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);

    if now % SCHED_INTERVAL_TICKS == 0 {
        let pend = unsafe {
            if SCHEDULER_PTR.is_null() {
                return;
            }
            let sched = &mut *SCHEDULER_PTR;
            sched.decide();
            sched.take_switch_pending()
        };
        if pend {
            arch::pend_context_switch();
        }
    }
}

/// Advance the tick counter directly. Stands in for the timer interrupt
/// in host unit tests of the timed wait paths.
#[cfg(test)]
pub(crate) fn advance_ticks(n: u32) {
    TICKS.fetch_add(n, Ordering::Relaxed);
}
