//! # Kestrel Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time — no dynamic allocation, no runtime configuration.

/// Maximum number of tasks, including the idle task in slot 0.
/// This bounds the static TCB array and the stack pool. Increase with
/// care — each slot consumes `THREAD_STACK_SIZE` bytes of RAM.
pub const MAX_TASKS: usize = 6;

/// Slot reserved for the idle task. The idle task is created by `init()`,
/// is permanently linked into its ready queue, and is the fallback the
/// scheduler leaves running when nothing else is ready.
pub const IDLE_TASK_ID: usize = 0;

/// SysTick frequency in Hz. One tick is one millisecond.
pub const TICK_HZ: u32 = 1_000;

/// Ticks between scheduling decisions. The tick counter advances every
/// tick; the decision step (and therefore the round-robin slice) runs at
/// this sub-interval.
pub const SCHED_INTERVAL_TICKS: u32 = 10;

/// Per-task stack size in bytes. Must be a multiple of 8 (AAPCS stack
/// alignment) and large enough for the deepest call chain plus one full
/// context frame (32 bytes hardware-stacked + 32 bytes software-saved).
pub const THREAD_STACK_SIZE: usize = 1024;

/// Number of scheduling priority levels (`Priority::Idle` through
/// `Priority::High`). One ready queue and one mask bit exist per level.
pub const NUM_PRIORITIES: usize = 4;

/// System clock frequency in Hz (STM32F401 on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Reset value of the xPSR placed in a new task's synthetic exception
/// frame. Only the Thumb bit is set.
pub const PSR_DEFAULT: u32 = 0x0100_0000;

/// Exception priority for SysTick: highest, so scheduling decisions are
/// never delayed by other handlers.
pub const SYSTICK_EXCEPTION_PRIORITY: u8 = 0x00;

/// Exception priority for PendSV: lowest, so the context switch only runs
/// once every other handler has finished and never nests mid-swap.
pub const PENDSV_EXCEPTION_PRIORITY: u8 = 0xFF;
