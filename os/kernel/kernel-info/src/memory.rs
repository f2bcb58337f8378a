//! # Memory Layout

use kernel_memory_addresses::{PageSize, Size4K};

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel executes (VMA), matches your linker script.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Where you place the bytes in *physical* memory (LMA) before paging.
///
/// The frame allocator manages everything from the end of the kernel image
/// (which starts here) up to [`PHYS_TOP`].
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// Ceiling of usable physical memory; frames at or above it are never handed out.
pub const PHYS_TOP: u64 = 0x0E00_0000; // 224 MiB

/// Number of 4 KiB frames below [`PHYS_TOP`], i.e. the capacity of the
/// kernel's frame table.
#[allow(clippy::cast_possible_truncation)]
pub const MAX_PHYS_FRAMES: usize = (PHYS_TOP / Size4K::SIZE) as usize;

const _: () = {
    assert!(PHYS_TOP.is_multiple_of(Size4K::SIZE));
    assert!(PHYS_LOAD.is_multiple_of(Size4K::SIZE));
    assert!(PHYS_LOAD < PHYS_TOP);
    assert!(KERNEL_BASE > HHDM_BASE);
    // The HHDM window must reach every managed frame without wrapping.
    assert!(HHDM_BASE.checked_add(PHYS_TOP).is_some());
    assert!(HHDM_BASE + PHYS_TOP <= KERNEL_BASE);
};
