#![allow(dead_code)]

use kernel_alloc::FrameAllocator;
use kernel_alloc::phys_mapper::PhysMapper;
use kernel_memory_addresses::PhysicalAddress;
use std::cell::UnsafeCell;

/// First address after the pretend kernel image; ends mid-frame on purpose.
pub const KERNEL_END: u64 = 0x1800;

/// Top of the pretend physical memory: frames 2, 3, 4 and 5 are managed.
pub const PHYS_TOP: u64 = 0x6000;

pub const FRAME: u64 = 0x1000;

/// Heap buffer standing in for physical memory `0 .. size`.
pub struct TestRam {
    bytes: Box<[UnsafeCell<u8>]>,
}

// SAFETY: the allocator only writes a frame while holding its lock and owning
// the frame; tests only read frames no other thread is using.
unsafe impl Sync for TestRam {}

impl TestRam {
    pub fn new(size: u64) -> Self {
        let bytes = (0..size).map(|_| UnsafeCell::new(0)).collect();
        Self { bytes }
    }

    fn ptr(&self, pa: PhysicalAddress, len: usize) -> *mut u8 {
        let start = usize::try_from(pa.as_u64()).unwrap();
        assert!(start + len <= self.bytes.len(), "{pa} outside of test RAM");
        UnsafeCell::raw_get(self.bytes.as_ptr()).wrapping_add(start)
    }

    pub fn fill(&self, pa: impl Into<PhysicalAddress>, len: usize, byte: u8) {
        let p = self.ptr(pa.into(), len);
        unsafe { p.write_bytes(byte, len) }
    }

    pub fn read(&self, pa: impl Into<PhysicalAddress>, len: usize) -> Vec<u8> {
        let p = self.ptr(pa.into(), len);
        unsafe { std::slice::from_raw_parts(p, len) }.to_vec()
    }
}

impl PhysMapper for TestRam {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let p = self.ptr(pa, size_of::<T>()).cast::<T>();
        unsafe { &mut *p }
    }
}

pub type TestAllocator = FrameAllocator<TestRam, 8>;

/// An initialized allocator managing exactly four frames, `0x2000..0x6000`.
pub fn four_frames() -> TestAllocator {
    let alloc = FrameAllocator::new(TestRam::new(PHYS_TOP));
    alloc
        .init(PhysicalAddress::new(KERNEL_END), PhysicalAddress::new(PHYS_TOP))
        .unwrap();
    alloc
}
