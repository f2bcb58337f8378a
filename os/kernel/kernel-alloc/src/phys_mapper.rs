//! # Physical memory access
//!
//! The frame allocator never dereferences a physical address directly. When it
//! needs to touch frame contents (filling a released frame with the sentinel
//! pattern) it asks a [`PhysMapper`] for a pointer in the current virtual
//! address space.
//!
//! - In the kernel, [`HhdmPhysMapper`] adds the higher-half direct map base:
//!   every physical address is mapped at `HHDM_BASE + pa`.
//! - In tests, a mapper backed by a plain heap buffer stands in for RAM, which
//!   lets the tests inspect what the allocator wrote.

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses to *temporarily* usable references in the
/// current virtual address space.
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference.
    ///
    /// # Safety
    /// - `pa` must be mapped writable for at least `size_of::<T>()` bytes and
    ///   suitably aligned for `T`.
    /// - The caller must guarantee exclusive access for the lifetime `'a`; the
    ///   frame allocator does so by only mapping frames it owns while holding
    ///   its lock.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// [`PhysMapper`] implementation for kernels with a higher-half direct map (HHDM).
///
/// # Safety
/// - The HHDM mapping must be present and cover the referenced physical range
///   (up to `PHYS_TOP`).
///
/// # Example
/// ```rust,no_run
/// use kernel_alloc::phys_mapper::{HhdmPhysMapper, PhysMapper};
/// use kernel_memory_addresses::PhysicalAddress;
///
/// let mapper = HhdmPhysMapper;
/// let frame: &mut [u8; 4096] = unsafe { mapper.phys_to_mut(PhysicalAddress::new(0x0040_0000)) };
/// frame.fill(0);
/// ```
#[derive(Debug, Default, Copy, Clone)]
pub struct HhdmPhysMapper;

impl PhysMapper for HhdmPhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = (HHDM_BASE + pa.as_u64()) as *mut T;
        // SAFETY: Caller must ensure the physical address is valid and mapped via HHDM.
        unsafe { &mut *va }
    }
}
