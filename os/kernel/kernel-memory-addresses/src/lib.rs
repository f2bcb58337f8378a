//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for raw physical addresses and the page-aligned
//! frame bases handed out by the physical frame allocator.
//!
//! ## Overview
//!
//! | Concept | Generic | Description |
//! |----------|----------|-------------|
//! | [`MemoryAddress`] | – | A raw 64-bit address. |
//! | [`MemoryPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned base address of a page of size `S`. |
//! | [`PhysicalAddress`] | – | A raw address with physical intent (host RAM / MMIO). |
//! | [`PhysicalPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned physical frame base. |
//!
//! A physical frame is identified two ways: by its base address, and by its
//! **frame index** (`base >> S::SHIFT`). The index is what frame tables are
//! keyed by, see [`PhysicalPage::index`] and [`PhysicalPage::from_index`].
//!
//! ## Page Sizes
//!
//! The frame allocator works exclusively on 4 KiB frames, modelled by the
//! [`Size4K`] marker type implementing [`PageSize`].
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! // The first whole frame after a kernel image ending mid-frame
//! let kernel_end = PhysicalAddress::new(0x0012_3456);
//! let first = kernel_end.align_up::<Size4K>().unwrap();
//! assert_eq!(first.as_u64(), 0x0012_4000);
//! assert!(first.is_aligned::<Size4K>());
//!
//! // Frame bases and frame indices convert both ways
//! let frame = PhysicalPage::<Size4K>::try_from_aligned(first).unwrap();
//! assert_eq!(frame.index(), 0x124);
//! assert_eq!(PhysicalPage::<Size4K>::from_index(0x124), frame);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`, making them suitable as map keys or for FFI use.
//! - All alignment calculations are `const fn`.
//! - The phantom marker `S` enforces the page size at the type level instead of
//!   using constants, ensuring all conversions are explicit.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod memory_address;
mod memory_page;
mod page_size;
mod physical_address;
mod physical_page;

pub use memory_address::MemoryAddress;
pub use memory_page::MemoryPage;
pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        let a = MemoryAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u64(), 0x12000);
        assert_eq!(a.align_up::<Size4K>().map(MemoryAddress::as_u64), Some(0x13000));
        assert_eq!(a.page::<Size4K>().base().as_u64(), 0x12000);
        assert!(!a.is_aligned::<Size4K>());
    }

    #[test]
    fn align_up_keeps_aligned_addresses() {
        let a = PhysicalAddress::new(0x8000);
        assert_eq!(a.align_up::<Size4K>(), Some(a));
        assert!(a.is_aligned::<Size4K>());
    }

    #[test]
    fn align_up_overflow_is_none() {
        let a = PhysicalAddress::new(u64::MAX - 2);
        assert_eq!(a.align_up::<Size4K>(), None);
    }

    #[test]
    fn frame_index_round_trip() {
        let pa = PhysicalAddress::new(0x0000_0000_0E00_0000);
        let frame = pa.page::<Size4K>();
        assert_eq!(frame.index(), 0xE000);
        assert_eq!(PhysicalPage::<Size4K>::from_index(frame.index()), frame);
        assert_eq!(frame.base(), pa);
    }

    #[test]
    fn try_from_aligned_rejects_unaligned() {
        assert!(PhysicalPage::<Size4K>::try_from_aligned(PhysicalAddress::new(0x1001)).is_none());
        assert!(PhysicalPage::<Size4K>::try_from_aligned(PhysicalAddress::new(0x1000)).is_some());
    }

    #[test]
    fn page_of_unaligned_address_rounds_down() {
        let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
        let pp = pa.page::<Size4K>();
        assert_eq!(pp.base().as_u64(), 0x0000_0010_2000_0000);
        assert_eq!(PhysicalAddress::from(pp), pp.base());
    }

    #[test]
    fn display_formats() {
        let pa = PhysicalAddress::new(0x1000);
        assert_eq!(format!("{pa}"), "0x0000000000001000");
        assert_eq!(format!("{pa:?}"), "PA(0x0000000000001000)");
        assert_eq!(format!("{}", pa.page::<Size4K>()), "0x0000000000001000/4K");
    }
}
