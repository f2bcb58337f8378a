//! # Frame table
//!
//! Per-frame bookkeeping of the frame allocator: one packed 64-bit slot per
//! frame index, holding the frame's reference count and its link in the free
//! list.
//!
//! The free list is an index-based LIFO stack threaded through the slots'
//! `next` fields. Nothing is ever written into the frames themselves.
//!
//! ```text
//!  head ──► [7] ──► [5] ──► [4] ──► NIL
//!
//!  slot: ┌──────────── refs (32) ────────────┬──── next (31) ────┬linked┐
//!        0                                   32                  63     64
//! ```
//!
//! # Invariants
//! - A slot with `linked` set has `refs == 0` and is reachable from `head`.
//! - `free` equals the number of linked slots.
//! - Only slots in `start..end` are ever linked or counted.

use bitfield_struct::bitfield;
use core::ops::Range;

/// Terminates the free list; also the exclusive upper bound of the table capacity.
pub const NIL: u32 = (1 << 31) - 1;

#[bitfield(u64)]
struct FrameSlot {
    /// Number of live owners of the frame.
    refs: u32,
    /// Index of the next free frame, [`NIL`] at the tail. Meaningless unless `linked`.
    #[bits(31)]
    next: u32,
    /// Whether the frame is on the free list.
    linked: bool,
}

pub struct FrameTable<const N: usize> {
    slots: [FrameSlot; N],
    /// Most recently freed frame, or [`NIL`].
    head: u32,
    free: usize,
    start: u32,
    end: u32,
    initialized: bool,
}

impl<const N: usize> FrameTable<N> {
    const CAPACITY_FITS: () = assert!(N < NIL as usize, "frame table capacity exceeds 31-bit indices");

    pub const fn new() -> Self {
        let () = Self::CAPACITY_FITS;
        Self {
            slots: [FrameSlot::new(); N],
            head: NIL,
            free: 0,
            start: 0,
            end: 0,
            initialized: false,
        }
    }

    /// Adopt the managed range `start..end`: every slot in it is reset to
    /// zero owners and unlinked, and the free list is emptied.
    pub fn reset(&mut self, start: u32, end: u32) {
        debug_assert!(start <= end && end as usize <= N);
        for slot in &mut self.slots[start as usize..end as usize] {
            *slot = FrameSlot::new();
        }
        self.head = NIL;
        self.free = 0;
        self.start = start;
        self.end = end;
        self.initialized = true;
    }

    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Managed frame indices.
    pub const fn range(&self) -> Range<u32> {
        self.start..self.end
    }

    pub const fn total(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub const fn free_count(&self) -> usize {
        self.free
    }

    pub const fn refs(&self, index: u32) -> u32 {
        self.slots[index as usize].refs()
    }

    pub const fn set_refs(&mut self, index: u32, refs: u32) {
        self.slots[index as usize].set_refs(refs);
    }

    pub const fn is_linked(&self, index: u32) -> bool {
        self.slots[index as usize].linked()
    }

    /// Link `index` onto the free list with zero owners.
    pub fn push(&mut self, index: u32) {
        debug_assert!(self.range().contains(&index));
        let slot = &mut self.slots[index as usize];
        debug_assert!(!slot.linked(), "frame {index} linked twice");
        *slot = FrameSlot::new()
            .with_refs(0)
            .with_next(self.head)
            .with_linked(true);
        self.head = index;
        self.free += 1;
    }

    /// Unlink the most recently freed frame.
    pub const fn pop(&mut self) -> Option<u32> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        let slot = &mut self.slots[index as usize];
        self.head = slot.next();
        slot.set_linked(false);
        self.free -= 1;
        Some(index)
    }
}
