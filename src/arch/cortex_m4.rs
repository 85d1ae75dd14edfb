//! # Cortex-M4 Port
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2): SysTick
//! configuration, exception-priority programming, the PendSV context
//! switch, and the one-time hand-off that turns the boot context into
//! the idle task.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by handlers, keeps the boot stack
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode
//!
//! On exception entry the hardware stacks R0–R3, R12, LR, PC and xPSR
//! onto the process stack automatically. The PendSV handler saves and
//! restores R4–R11 around the stack-pointer swap, completing the full
//! register-file exchange.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: 0x00 (highest) — scheduling decisions are never delayed
//! - PendSV:  0xFF (lowest)  — the swap runs only once every other
//!   handler has finished, and can never nest inside itself
//!
//! The decision/execution split is strict: SysTick decides *what* runs
//! next and records the outgoing/incoming `stack_top` slot addresses in
//! the switch descriptor; PendSV performs the swap through those two
//! addresses and nothing else.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{
    PENDSV_EXCEPTION_PRIORITY, SYSTEM_CLOCK_HZ, SYSTICK_EXCEPTION_PRIORITY, TICK_HZ,
};
use crate::task::TaskEntry;

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer to fire at `TICK_HZ` off the processor
/// clock. Each tick enters `SysTick()` below, which drives the kernel's
/// tick callback.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// Exception priorities
// ---------------------------------------------------------------------------

/// Program SHPR3 so SysTick preempts everything and PendSV yields to
/// everything.
///
/// SHPR3 (0xE000_ED20): bits [23:16] = PendSV, bits [31:24] = SysTick.
pub fn set_exception_priorities() {
    const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;
    unsafe {
        let val = core::ptr::read_volatile(SHPR3);
        let val = (val & 0x0000_FFFF)
            | ((PENDSV_EXCEPTION_PRIORITY as u32) << 16)
            | ((SYSTICK_EXCEPTION_PRIORITY as u32) << 24);
        core::ptr::write_volatile(SHPR3, val);
    }
}

// ---------------------------------------------------------------------------
// Context-switch request
// ---------------------------------------------------------------------------

/// Pend the PendSV exception: request an asynchronous context switch,
/// executed as soon as the exception priority rules allow.
///
/// Sets PENDSVSET in the Interrupt Control and State Register.
#[inline]
pub fn pend_context_switch() {
    // ICSR address: 0xE000_ED04, PENDSVSET = bit 28
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

// ---------------------------------------------------------------------------
// Idle hand-off
// ---------------------------------------------------------------------------

/// Turn the calling (boot) context into the idle task.
///
/// Points the PSP at the idle task's stack region, flips thread mode
/// onto the process stack (CONTROL.SPSEL), re-enables interrupts, and
/// branches into the idle entry. The boot stack remains the MSP for
/// handler mode. Never returns.
///
/// # Safety
/// Must be called exactly once, from thread mode on the MSP, with
/// interrupts disabled and `kernel::init()` already done.
pub unsafe fn become_idle(idle_sp: *const u32, entry: TaskEntry) -> ! {
    asm!(
        "msr psp, r2",     // idle process stack
        "movs r3, #2",
        "msr control, r3", // thread mode now runs on the PSP
        "isb",
        "cpsie i",
        "bx r1",           // enter the idle entry with r0 = arg
        in("r0") 0usize,
        in("r1") entry,
        in("r2") idle_sp,
        options(noreturn),
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// ## Sequence
/// 1. Push R4–R11 onto the outgoing task's process stack
/// 2. Store the resulting PSP through the descriptor's outgoing slot
/// 3. Load the incoming PSP through the descriptor's incoming slot
/// 4. Pop R4–R11 from the incoming task's stack
/// 5. Return with EXC_RETURN 0xFFFF_FFFD — the hardware restores
///    R0–R3, R12, LR, PC, xPSR and resumes the incoming task
///
/// The handler allocates nothing and only calls the two leaf helpers
/// below, which dereference the pre-recorded slot addresses; at the
/// lowest exception priority it can never nest inside itself or run
/// while any other handler is mid-flight.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        // --- Save outgoing context ---
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {store}",              // store_outgoing_stack(psp)

        // --- Fetch incoming context ---
        "bl {load}",               // returns the new PSP in r0
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",

        // Return to thread mode on the process stack
        "ldr r0, =0xFFFFFFFD",
        "bx r0",

        store = sym store_outgoing_stack,
        load = sym load_incoming_stack,
    );
}

/// Store the outgoing task's pushed-down stack pointer through the
/// switch descriptor. Called from PendSV only.
///
/// # Safety
/// Runs in handler context after `kernel::init()`; the descriptor slots
/// were recorded by the most recent scheduling decision.
unsafe extern "C" fn store_outgoing_stack(psp: *mut u32) {
    let sched = &mut *crate::kernel::SCHEDULER_PTR;
    sched.switch.current_sp_slot.write(psp);
}

/// Fetch the incoming task's saved stack pointer through the switch
/// descriptor. Called from PendSV only.
///
/// # Safety
/// As for `store_outgoing_stack`.
unsafe extern "C" fn load_incoming_stack() -> *mut u32 {
    let sched = &*crate::kernel::SCHEDULER_PTR;
    sched.switch.next_sp_slot.read()
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — the kernel's tick source. Runs at the
/// highest exception priority; the kernel callback advances the counter,
/// runs the scheduling decision at its sub-interval, and pends PendSV
/// when a switch was decided.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    crate::kernel::tick();
}
