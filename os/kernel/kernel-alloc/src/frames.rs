//! # Kernel-wide frame allocator
//!
//! The one [`FrameAllocator`] instance the kernel uses, sized from the
//! compile-time memory layout in [`kernel_info::memory`] and touching frame
//! contents through the higher-half direct map.
//!
//! Boot code calls [`init_frames`] once with the end of the kernel image;
//! afterwards every subsystem shares [`FRAMES`] by reference.

use crate::error::FrameAllocInitError;
use crate::frame_alloc::{FrameAllocator, FrameStats};
use crate::phys_mapper::HhdmPhysMapper;
use kernel_info::memory::{MAX_PHYS_FRAMES, PHYS_TOP};
use kernel_memory_addresses::PhysicalAddress;

pub type KernelFrameAllocator = FrameAllocator<HhdmPhysMapper, MAX_PHYS_FRAMES>;

/// Physical frames between the kernel image and [`PHYS_TOP`].
pub static FRAMES: KernelFrameAllocator = FrameAllocator::new(HhdmPhysMapper);

/// Seed [`FRAMES`] with every whole frame from `kernel_end` up to [`PHYS_TOP`].
///
/// Must run after the HHDM covers all of physical memory below [`PHYS_TOP`].
///
/// # Errors
/// See [`FrameAllocator::init`].
pub fn init_frames(kernel_end: PhysicalAddress) -> Result<FrameStats, FrameAllocInitError> {
    FRAMES.init(kernel_end, PhysicalAddress::new(PHYS_TOP))
}
