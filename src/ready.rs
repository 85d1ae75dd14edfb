//! # Ready Queue Set
//!
//! One FIFO of runnable tasks per priority level, plus a bitmask with one
//! bit per level set iff that level's queue is non-empty. The FIFOs are
//! intrusive: they thread through the `next` field of the TCBs, so no
//! storage is allocated here beyond the head/tail indices.
//!
//! Invariant, restored after every operation: bit *p* of the mask is set
//! if and only if queue *p* holds at least one task. The scheduler relies
//! on this to pick the next task in O(1) with a single
//! count-leading-zeros scan.

use crate::config::NUM_PRIORITIES;
use crate::task::{Priority, Tcb};

/// Head/tail indices of one priority level's FIFO.
#[derive(Clone, Copy)]
struct Fifo {
    head: Option<usize>,
    tail: Option<usize>,
}

impl Fifo {
    const EMPTY: Fifo = Fifo {
        head: None,
        tail: None,
    };
}

/// The per-priority ready queues and their occupancy mask.
pub struct ReadyQueueSet {
    queues: [Fifo; NUM_PRIORITIES],
    mask: u8,
}

impl ReadyQueueSet {
    /// All queues empty, mask clear.
    pub const fn new() -> Self {
        Self {
            queues: [Fifo::EMPTY; NUM_PRIORITIES],
            mask: 0,
        }
    }

    /// Append `id` to the tail of its priority's FIFO in O(1), setting
    /// the level's mask bit if the queue was empty.
    ///
    /// The caller must not insert a task that is already linked.
    pub fn insert(&mut self, tcbs: &mut [Tcb], id: usize) {
        let pri = tcbs[id].priority;
        let queue = &mut self.queues[pri as usize];
        tcbs[id].next = None;

        match queue.tail {
            Some(tail) => tcbs[tail].next = Some(id),
            None => queue.head = Some(id),
        }
        queue.tail = Some(id);
        self.mask |= pri.bit();
    }

    /// Pop the head of `pri`'s FIFO in O(1), clearing the level's mask
    /// bit if the queue becomes empty. Returns `None` if already empty.
    pub fn remove_head(&mut self, tcbs: &mut [Tcb], pri: Priority) -> Option<usize> {
        let queue = &mut self.queues[pri as usize];
        let head = queue.head?;

        queue.head = tcbs[head].next;
        if queue.head.is_none() {
            queue.tail = None;
            self.mask &= !pri.bit();
        }
        tcbs[head].next = None;
        Some(head)
    }

    /// The highest priority level whose queue is non-empty, found via a
    /// find-highest-set-bit scan over the mask.
    pub fn highest(&self) -> Option<Priority> {
        if self.mask == 0 {
            return None;
        }
        Priority::from_index(31 - (self.mask as u32).leading_zeros())
    }

    /// The occupancy mask, bit *p* set iff queue *p* is non-empty.
    #[inline]
    pub const fn mask(&self) -> u8 {
        self.mask
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TASKS;

    fn table() -> [Tcb; MAX_TASKS] {
        let mut tcbs = [Tcb::EMPTY; MAX_TASKS];
        for (i, tcb) in tcbs.iter_mut().enumerate() {
            tcb.id = i;
        }
        tcbs
    }

    /// Walk one FIFO through the intrusive links.
    fn drain_order(
        set: &mut ReadyQueueSet,
        tcbs: &mut [Tcb; MAX_TASKS],
        pri: Priority,
    ) -> std::vec::Vec<usize> {
        let mut order = std::vec::Vec::new();
        while let Some(id) = set.remove_head(tcbs, pri) {
            order.push(id);
        }
        order
    }

    /// The mask bit must agree with queue occupancy after every call.
    fn assert_mask_invariant(set: &ReadyQueueSet) {
        for i in 0..NUM_PRIORITIES {
            let pri = Priority::from_index(i as u32).unwrap();
            let occupied = set.queues[i].head.is_some();
            assert_eq!(
                set.mask & pri.bit() != 0,
                occupied,
                "mask bit {} disagrees with queue occupancy",
                i
            );
            assert_eq!(set.queues[i].head.is_none(), set.queues[i].tail.is_none());
        }
    }

    #[test]
    fn starts_empty() {
        let set = ReadyQueueSet::new();
        assert_eq!(set.mask(), 0);
        assert_eq!(set.highest(), None);
    }

    #[test]
    fn insert_sets_bit_and_remove_clears_it() {
        let mut tcbs = table();
        let mut set = ReadyQueueSet::new();
        tcbs[1].priority = Priority::Medium;

        set.insert(&mut tcbs, 1);
        assert_mask_invariant(&set);
        assert_eq!(set.highest(), Some(Priority::Medium));

        assert_eq!(set.remove_head(&mut tcbs, Priority::Medium), Some(1));
        assert_mask_invariant(&set);
        assert_eq!(set.mask(), 0);
        assert_eq!(set.remove_head(&mut tcbs, Priority::Medium), None);
    }

    #[test]
    fn fifo_order_within_a_level() {
        let mut tcbs = table();
        let mut set = ReadyQueueSet::new();
        for id in [1, 2, 3] {
            tcbs[id].priority = Priority::Low;
            set.insert(&mut tcbs, id);
            assert_mask_invariant(&set);
        }
        assert_eq!(drain_order(&mut set, &mut tcbs, Priority::Low), [1, 2, 3]);
        assert_mask_invariant(&set);
    }

    #[test]
    fn highest_scans_the_mask_top_down() {
        let mut tcbs = table();
        let mut set = ReadyQueueSet::new();

        tcbs[0].priority = Priority::Idle;
        tcbs[1].priority = Priority::Low;
        tcbs[2].priority = Priority::High;
        set.insert(&mut tcbs, 0);
        assert_eq!(set.highest(), Some(Priority::Idle));
        set.insert(&mut tcbs, 1);
        assert_eq!(set.highest(), Some(Priority::Low));
        set.insert(&mut tcbs, 2);
        assert_eq!(set.highest(), Some(Priority::High));

        set.remove_head(&mut tcbs, Priority::High);
        assert_eq!(set.highest(), Some(Priority::Low));
        set.remove_head(&mut tcbs, Priority::Low);
        assert_eq!(set.highest(), Some(Priority::Idle));
        assert_mask_invariant(&set);
    }

    #[test]
    fn interleaved_operations_keep_the_invariant() {
        let mut tcbs = table();
        let mut set = ReadyQueueSet::new();
        tcbs[1].priority = Priority::Medium;
        tcbs[2].priority = Priority::Medium;
        tcbs[3].priority = Priority::High;

        set.insert(&mut tcbs, 1);
        set.insert(&mut tcbs, 3);
        assert_mask_invariant(&set);

        assert_eq!(set.remove_head(&mut tcbs, Priority::High), Some(3));
        assert_mask_invariant(&set);

        set.insert(&mut tcbs, 2);
        assert_eq!(set.remove_head(&mut tcbs, Priority::Medium), Some(1));
        assert_mask_invariant(&set);

        // re-insert after removal, as the scheduler's rotation does
        set.insert(&mut tcbs, 1);
        assert_eq!(drain_order(&mut set, &mut tcbs, Priority::Medium), [2, 1]);
        assert_mask_invariant(&set);
    }
}
