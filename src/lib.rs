//! # Kestrel — a minimal preemptive RTOS kernel
//!
//! Kestrel multiplexes a single ARM Cortex-M4 core across a fixed number of
//! tasks using fixed-priority preemptive scheduling with round-robin
//! time-slicing among equal priorities, and provides two busy-wait
//! synchronization primitives (mutex, counting semaphore) built on the
//! shared millisecond tick counter.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                   Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                  │
//! │  init() · create_task() · start() · delay() · yield()  │
//! ├──────────────┬───────────────────┬────────────────────┤
//! │  Scheduler   │  Ready Queues     │  Sync Primitives   │
//! │ scheduler.rs │  ready.rs         │  sync/             │
//! │ ─ decide()   │  ─ insert()       │  ─ Mutex           │
//! │ ─ create()   │  ─ remove_head()  │  ─ Semaphore       │
//! ├──────────────┴───────────────────┴────────────────────┤
//! │              Task Model (task.rs)                      │
//! │        Tcb · Priority · intrusive FIFO link            │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)               │
//! │   SysTick · PendSV · Context Switch · Idle Hand-off    │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! Two exception priorities carry the whole kernel:
//!
//! - **SysTick** runs at the *highest* priority. It advances the tick
//!   counter and, at a fixed sub-interval, runs the scheduling decision:
//!   pick the highest non-empty ready queue and, if the running task's
//!   priority is less than or equal to it, rotate the running task to the
//!   tail of its own queue and pend a context switch.
//! - **PendSV** runs at the *lowest* priority. It performs the actual
//!   stack-pointer swap and R4–R11 save/restore through two slot addresses
//!   the decision step recorded, so the timing-critical restore never has
//!   to resolve a task control block.
//!
//! Tasks never block: a task waiting on a mutex or semaphore spins on the
//! tick counter and remains schedulable, so preemption keeps every other
//! ready task making progress. There is no priority inheritance — a
//! deliberate, documented limitation of the busy-wait design.
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **No `alloc`**: pure `core` only
//! - **Fixed-size TCB array**: `[Tcb; MAX_TASKS]`, slot 0 is the idle task
//! - **Contiguous stack pool**: one 8-aligned region subdivided into equal
//!   per-task stacks at `init()`
//! - **Critical sections**: `critical_section::with()` around every short
//!   check-and-mutate region shared with the tick interrupt

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod ready;
pub mod scheduler;
pub mod sync;
pub mod task;
