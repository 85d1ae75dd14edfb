//! # Scheduler
//!
//! Fixed-priority preemptive scheduling over a fixed table of tasks.
//!
//! The scheduler owns the TCB array, the per-priority ready queues, the
//! contiguous stack pool, and the switch descriptor that hands a decision
//! over to the PendSV context-switch handler. It is stored as a single
//! global instance in `kernel.rs`; everything mutable in it is touched
//! only with interrupts masked or from the tick handler itself.
//!
//! ## Decision Algorithm
//!
//! `decide()` runs from the tick path every `SCHED_INTERVAL_TICKS` ticks
//! and from `yield_now()`:
//!
//! 1. If the only non-empty ready queue is the idle task's, nothing to do.
//! 2. Otherwise find the highest non-empty priority level.
//! 3. If the running task's priority is **less than or equal** to it, the
//!    running task rotates to the tail of its own queue, the head of the
//!    highest level becomes current, the switch descriptor's two
//!    stack-slot addresses are updated, and a context switch is flagged.
//! 4. A strictly lower-priority level never preempts.
//!
//! The ≤ comparison gives round-robin time-slicing among equal-priority
//! tasks through the same path as priority preemption, at the cost of a
//! queue round-trip even when only a peer is ready.

use crate::config::{
    IDLE_TASK_ID, MAX_TASKS, PSR_DEFAULT, THREAD_STACK_SIZE,
};
use crate::error::KernelError;
use crate::ready::ReadyQueueSet;
use crate::task::{Priority, TaskEntry, Tcb};

// ---------------------------------------------------------------------------
// Context frame layout
// ---------------------------------------------------------------------------
//
// A suspended task's stack holds, from its saved stack pointer upward:
//
// ```text
// [Software-saved context]   <- stack_top points here
//   R4  R5  R6  R7  R8  R9  R10  R11      popped by the PendSV handler
// [Hardware-stacked frame]
//   R0  R1  R2  R3  R12  LR  PC  xPSR     popped on exception return
// ```
//
// The bootstrap synthesizes exactly this image so that the first switch
// into a task is indistinguishable from a switch between two tasks that
// have both run before.

/// Registers the PendSV handler saves and restores manually (R4–R11).
const SW_FRAME_WORDS: usize = 8;
/// Registers the hardware stacks on exception entry (R0–R3, R12, LR, PC, xPSR).
const HW_FRAME_WORDS: usize = 8;
/// Whole context frame, in 32-bit words.
const FRAME_WORDS: usize = SW_FRAME_WORDS + HW_FRAME_WORDS;
/// Whole context frame, in bytes.
pub(crate) const FRAME_BYTES: usize = FRAME_WORDS * 4;

/// Word offsets within the frame, counted from the saved stack pointer.
pub(crate) const FRAME_R0: usize = 8;
pub(crate) const FRAME_LR: usize = 13;
pub(crate) const FRAME_PC: usize = 14;
pub(crate) const FRAME_XPSR: usize = 15;

// ---------------------------------------------------------------------------
// Switch descriptor
// ---------------------------------------------------------------------------

/// Hand-off record between the scheduling decision and the PendSV
/// context-switch handler.
///
/// `decide()` records the *addresses* of the outgoing and incoming tasks'
/// `stack_top` fields here, so the handler performs the swap through two
/// loads and never resolves a TCB by id inside the timing-critical
/// restore path. Mutated only with interrupts masked or from the tick
/// handler; the two exception handlers are non-reentrant with respect to
/// each other by priority configuration.
pub struct SwitchDescriptor {
    /// Id of the currently-running task.
    pub current: usize,
    /// Address of the outgoing task's `stack_top` slot.
    pub current_sp_slot: *mut *mut u32,
    /// Address of the incoming task's `stack_top` slot.
    pub next_sp_slot: *const *mut u32,
}

impl SwitchDescriptor {
    const fn new() -> Self {
        Self {
            current: IDLE_TASK_ID,
            current_sp_slot: core::ptr::null_mut(),
            next_sp_slot: core::ptr::null(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stack pool
// ---------------------------------------------------------------------------

/// One contiguous, 8-aligned region subdivided into equal per-task stacks
/// by `init()`. AAPCS requires 8-byte stack alignment.
#[repr(align(8))]
struct StackPool {
    bytes: [u8; MAX_TASKS * THREAD_STACK_SIZE],
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The central kernel state: TCB table, ready queues, stack pool, and the
/// switch descriptor. Lives as a single global in `kernel.rs`.
pub struct Scheduler {
    /// Fixed TCB table. Slot `IDLE_TASK_ID` is the idle task.
    pub tcbs: [Tcb; MAX_TASKS],

    /// Per-priority ready queues plus occupancy mask.
    pub ready: ReadyQueueSet,

    /// Decision → context-switch hand-off record.
    pub switch: SwitchDescriptor,

    /// Number of allocated slots (including the idle task). Allocation is
    /// monotonic: slots are never freed or reused.
    pub task_count: usize,

    /// Set by `decide()` when a switch must be performed; consumed by the
    /// caller, which arms the PendSV exception.
    switch_pending: bool,

    stacks: StackPool,
}

impl Scheduler {
    /// A scheduler with no tasks and an unlaid-out stack pool.
    /// `init()` must run before anything else.
    pub const fn new() -> Self {
        Self {
            tcbs: [Tcb::EMPTY; MAX_TASKS],
            ready: ReadyQueueSet::new(),
            switch: SwitchDescriptor::new(),
            task_count: 0,
            switch_pending: false,
            stacks: StackPool {
                bytes: [0; MAX_TASKS * THREAD_STACK_SIZE],
            },
        }
    }

    /// Lay out the stack pool and install the idle task in slot 0.
    ///
    /// Subdivides the pool into `MAX_TASKS` disjoint equal-size regions,
    /// assigns each slot its region with `stack_top` starting at
    /// `stack_base`, links the idle task into its ready queue (where it
    /// stays permanently), and points the switch descriptor at it.
    ///
    /// The computed addresses refer to the pool inside `self`; the
    /// scheduler must not move after this call.
    pub fn init(&mut self) -> Result<(), KernelError> {
        if THREAD_STACK_SIZE % 8 != 0 || THREAD_STACK_SIZE < FRAME_BYTES {
            return Err(KernelError::InvalidStackLayout);
        }

        let mut region = self.stacks.bytes.as_ptr() as usize;
        for (i, tcb) in self.tcbs.iter_mut().enumerate() {
            tcb.id = i;
            tcb.stack_base = region;
            tcb.stack_top = region as *mut u32;
            tcb.priority = Priority::Idle;
            tcb.next = None;
            region += THREAD_STACK_SIZE;
        }

        // The idle task's context is the caller of `start()`; it needs no
        // synthetic frame, only its slot and a permanent queue entry.
        self.ready.insert(&mut self.tcbs, IDLE_TASK_ID);
        self.task_count = 1;

        self.switch.current = IDLE_TASK_ID;
        self.switch.current_sp_slot = &mut self.tcbs[IDLE_TASK_ID].stack_top;
        self.switch.next_sp_slot = &self.tcbs[IDLE_TASK_ID].stack_top;
        self.switch_pending = false;
        Ok(())
    }

    /// Register a new task.
    ///
    /// Builds the synthetic context frame at the top of the slot's stack
    /// region, records it as the task's saved stack pointer, and inserts
    /// the task into the ready queue for its priority. Fails with
    /// `CapacityExceeded` once all slots are consumed.
    pub fn create_task(
        &mut self,
        entry: TaskEntry,
        arg: usize,
        priority: Priority,
    ) -> Result<usize, KernelError> {
        if self.task_count >= MAX_TASKS {
            return Err(KernelError::CapacityExceeded);
        }

        let id = self.task_count;
        self.tcbs[id].priority = priority;
        init_task_stack(&mut self.tcbs[id], entry, arg);
        self.ready.insert(&mut self.tcbs, id);
        self.task_count += 1;
        Ok(id)
    }

    /// The scheduling decision step. See the module docs for the
    /// algorithm. Arms nothing itself — on a switch it updates the
    /// descriptor and sets the pending flag for the caller to consume.
    pub fn decide(&mut self) {
        // Fast path: only the idle queue is occupied. Either the idle
        // task is running (keep idling) or the running task outranks the
        // idle level; no switch in either case.
        if self.ready.mask() == Priority::Idle.bit() {
            return;
        }
        let highest = match self.ready.highest() {
            Some(pri) => pri,
            None => return,
        };

        let current = self.switch.current;
        if self.tcbs[current].priority > highest {
            // A strictly lower-priority task never preempts.
            return;
        }

        // Rotate the current task to the tail of its own queue. The idle
        // task never left its queue, so it alone is not re-inserted.
        if current != IDLE_TASK_ID {
            self.ready.insert(&mut self.tcbs, current);
        }
        let next = match self.ready.remove_head(&mut self.tcbs, highest) {
            Some(id) => id,
            // The mask said this queue was non-empty; reaching here means
            // the queue state is corrupted and nothing can be scheduled.
            None => panic!("ready mask set over an empty queue"),
        };

        self.switch.current_sp_slot = &mut self.tcbs[current].stack_top;
        self.switch.next_sp_slot = &self.tcbs[next].stack_top;
        self.switch.current = next;
        self.switch_pending = true;
    }

    /// Consume the pending-switch flag set by `decide()`.
    pub fn take_switch_pending(&mut self) -> bool {
        let pending = self.switch_pending;
        self.switch_pending = false;
        pending
    }

    /// Initial process stack pointer for the idle task: the 8-aligned top
    /// of slot 0's region. Used once, when `start()` hands the boot
    /// context over to the idle task.
    pub fn idle_stack_top(&self) -> *const u32 {
        (self.tcbs[IDLE_TASK_ID].stack_limit() & !0x07) as *const u32
    }
}

// ---------------------------------------------------------------------------
// Task bootstrap
// ---------------------------------------------------------------------------

/// Build the initial stack image for a new task.
///
/// Pre-populates the hardware exception frame (with the entry point in
/// the PC slot, the argument in R0, and the Thumb bit in xPSR) and zeroes
/// the software-saved R4–R11 below it, so the first PendSV restore into
/// this task behaves identically to a switch between two running tasks.
fn init_task_stack(tcb: &mut Tcb, entry: TaskEntry, arg: usize) {
    // 8-byte alignment per AAPCS; the region top is already 8-aligned for
    // any valid `THREAD_STACK_SIZE`, the mask keeps it explicit.
    let aligned_top = tcb.stack_limit() & !0x07;
    let frame = (aligned_top - FRAME_BYTES) as *mut u32;

    unsafe {
        // Software-saved registers R4–R11.
        for i in 0..SW_FRAME_WORDS {
            frame.add(i).write(0);
        }

        // Hardware-stacked frame R0–R3, R12, LR, PC, xPSR.
        frame.add(FRAME_R0).write(arg as u32);
        for i in FRAME_R0 + 1..FRAME_LR {
            frame.add(i).write(0); // R1, R2, R3, R12
        }
        frame.add(FRAME_LR).write(task_exit as usize as u32);
        frame.add(FRAME_PC).write(entry as usize as u32);
        frame.add(FRAME_XPSR).write(PSR_DEFAULT);
    }

    tcb.stack_top = frame;
}

/// Trap for a task entry that returns. Entries are `fn(usize) -> !`, so
/// this is only reachable through memory corruption; park the core.
extern "C" fn task_exit() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SCHED_INTERVAL_TICKS;
    use std::boxed::Box;

    extern "C" fn spin_entry(_arg: usize) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    /// Boxed so the pool addresses computed by `init()` stay put while
    /// the tests move the handle around.
    fn kernel() -> Box<Scheduler> {
        let mut sched = Box::new(Scheduler::new());
        sched.init().unwrap();
        sched
    }

    fn decide_and_take(sched: &mut Scheduler) -> bool {
        sched.decide();
        sched.take_switch_pending()
    }

    #[test]
    fn init_lays_out_disjoint_stack_regions() {
        let sched = kernel();
        for i in 0..MAX_TASKS - 1 {
            assert_eq!(
                sched.tcbs[i].stack_base + THREAD_STACK_SIZE,
                sched.tcbs[i + 1].stack_base
            );
        }
        for tcb in &sched.tcbs {
            assert_eq!(tcb.stack_top as usize, tcb.stack_base);
        }
        assert_eq!(sched.switch.current, IDLE_TASK_ID);
        assert_eq!(sched.ready.mask(), Priority::Idle.bit());
    }

    #[test]
    fn capacity_is_monotonic_and_bounded() {
        let mut sched = kernel();
        // Slot 0 is the idle task; the rest are open.
        for _ in 0..MAX_TASKS - 1 {
            sched
                .create_task(spin_entry, 0, Priority::Low)
                .unwrap();
        }
        assert_eq!(sched.task_count, MAX_TASKS);
        assert_eq!(
            sched.create_task(spin_entry, 0, Priority::Low),
            Err(KernelError::CapacityExceeded)
        );
        // A failed create consumes nothing.
        assert_eq!(sched.task_count, MAX_TASKS);
    }

    #[test]
    fn bootstrap_frame_matches_the_restore_layout() {
        let mut sched = kernel();
        let id = sched
            .create_task(spin_entry, 0xDEAD_BEEF, Priority::High)
            .unwrap();
        let tcb = &sched.tcbs[id];

        let sp = tcb.stack_top;
        assert_eq!(sp as usize % 8, 0);
        assert_eq!(sp as usize, (tcb.stack_limit() & !0x07) - FRAME_BYTES);
        assert!(sp as usize >= tcb.stack_base);

        let word = |i: usize| unsafe { sp.add(i).read() };
        // Software-saved R4–R11 start out zeroed.
        for i in 0..SW_FRAME_WORDS {
            assert_eq!(word(i), 0);
        }
        assert_eq!(word(FRAME_LR), task_exit as usize as u32);
        assert_eq!(word(FRAME_XPSR), PSR_DEFAULT);

        // Simulate the first switch-in: pop R4–R11, then read the words
        // the hardware restores on exception return.
        let hw_frame = unsafe { sp.add(SW_FRAME_WORDS) };
        let r0 = unsafe { hw_frame.read() };
        let pc = unsafe { hw_frame.add(FRAME_PC - SW_FRAME_WORDS).read() };
        assert_eq!(r0, 0xDEAD_BEEF, "entry argument must arrive in R0");
        assert_eq!(pc, spin_entry as usize as u32, "execution must resume at the entry point");
    }

    #[test]
    fn idle_fallback_never_arms_a_switch() {
        let mut sched = kernel();
        for _ in 0..4 * SCHED_INTERVAL_TICKS {
            assert!(!decide_and_take(&mut sched));
            assert_eq!(sched.switch.current, IDLE_TASK_ID);
            assert_eq!(sched.ready.mask(), Priority::Idle.bit());
        }
    }

    #[test]
    fn round_robin_cycles_equal_priorities() {
        let mut sched = kernel();
        let a = sched.create_task(spin_entry, 0, Priority::Medium).unwrap();
        let b = sched.create_task(spin_entry, 0, Priority::Medium).unwrap();
        let c = sched.create_task(spin_entry, 0, Priority::Medium).unwrap();

        // Each task runs exactly once within any window of three
        // consecutive decisions.
        let mut observed = std::vec::Vec::new();
        for _ in 0..6 {
            assert!(decide_and_take(&mut sched));
            observed.push(sched.switch.current);
        }
        assert_eq!(observed, [a, b, c, a, b, c]);
    }

    #[test]
    fn equal_priority_switch_updates_the_descriptor_slots() {
        let mut sched = kernel();
        let a = sched.create_task(spin_entry, 0, Priority::Low).unwrap();
        let b = sched.create_task(spin_entry, 0, Priority::Low).unwrap();

        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, a);
        // Outgoing slot is the idle task's, incoming is task a's.
        assert_eq!(
            sched.switch.current_sp_slot as *const _,
            &sched.tcbs[IDLE_TASK_ID].stack_top as *const _
        );
        assert_eq!(sched.switch.next_sp_slot, &sched.tcbs[a].stack_top as *const _);

        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, b);
        assert_eq!(
            sched.switch.current_sp_slot as *const _,
            &sched.tcbs[a].stack_top as *const _
        );
        assert_eq!(sched.switch.next_sp_slot, &sched.tcbs[b].stack_top as *const _);
    }

    #[test]
    fn higher_priority_preempts_on_the_next_decision() {
        let mut sched = kernel();
        let low = sched.create_task(spin_entry, 0, Priority::Low).unwrap();
        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, low);

        let high = sched.create_task(spin_entry, 0, Priority::High).unwrap();
        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, high);

        // The preempted task went back to its queue and its level's bit
        // is set again.
        assert_ne!(sched.ready.mask() & Priority::Low.bit(), 0);
    }

    #[test]
    fn lower_priority_never_preempts() {
        let mut sched = kernel();
        let high = sched.create_task(spin_entry, 0, Priority::High).unwrap();
        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, high);

        sched.create_task(spin_entry, 0, Priority::Low).unwrap();
        sched.create_task(spin_entry, 0, Priority::Medium).unwrap();
        for _ in 0..5 {
            assert!(!decide_and_take(&mut sched));
            assert_eq!(sched.switch.current, high);
        }
    }

    #[test]
    fn sole_runner_keeps_the_cpu_without_a_queue_round_trip() {
        let mut sched = kernel();
        let only = sched.create_task(spin_entry, 0, Priority::Medium).unwrap();
        assert!(decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, only);

        // Its queue is now empty, so the mask is idle-only and the fast
        // path keeps it running.
        assert_eq!(sched.ready.mask(), Priority::Idle.bit());
        assert!(!decide_and_take(&mut sched));
        assert_eq!(sched.switch.current, only);
    }
}
