//! No-op port for host builds.
//!
//! Lets the architecture-independent parts of the kernel compile and
//! unit-test off-target. Context switching cannot be simulated here, so
//! `become_idle` is unreachable on the host; the remaining shims simply
//! do nothing.

use crate::task::TaskEntry;

/// Host stand-in for the SysTick setup. No timer exists; tests advance
/// the tick counter themselves.
pub fn configure_systick(_syst: &mut cortex_m::peripheral::SYST) {}

/// Host stand-in for the SHPR3 programming.
pub fn set_exception_priorities() {}

/// Host stand-in for the PendSV trigger. The decision state it would
/// consume is inspected by tests instead.
pub fn pend_context_switch() {}

/// Never called on the host; `start()` only runs on the target.
pub unsafe fn become_idle(_idle_sp: *const u32, _entry: TaskEntry) -> ! {
    unimplemented!("context switching requires the Cortex-M4 target")
}
