//! Error types of the frame allocator.

use kernel_memory_addresses::PhysicalAddress;

/// Error returned by [`FrameAllocator::init`](crate::frame_alloc::FrameAllocator::init).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAllocInitError {
    #[error("frame allocator is already initialized")]
    AlreadyInitialized,
    #[error("no whole frame between kernel end {kernel_end} and top of memory {phys_top}")]
    EmptyRange {
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    },
    #[error("top of memory {phys_top} exceeds the frame table capacity of {capacity} frames")]
    CapacityExceeded {
        phys_top: PhysicalAddress,
        capacity: usize,
    },
}

/// A caller broke the frame allocator's contract.
///
/// The `try_*` operations report these; the infallible operations treat them
/// as fatal and halt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame allocator is not initialized")]
    Uninitialized,
    #[error("frame address {0} is not aligned to a 4 KiB boundary")]
    Misaligned(PhysicalAddress),
    #[error("frame address {addr} lies below the managed range starting at {start}")]
    BelowRange {
        addr: PhysicalAddress,
        start: PhysicalAddress,
    },
    #[error("frame address {addr} lies at or above the managed range ending at {end}")]
    AboveRange {
        addr: PhysicalAddress,
        end: PhysicalAddress,
    },
    #[error("double free of frame {0}")]
    DoubleFree(PhysicalAddress),
    #[error("frame {0} is not allocated")]
    NotAllocated(PhysicalAddress),
    #[error("reference count of frame {0} overflows")]
    RefCountOverflow(PhysicalAddress),
    #[error("reference count of frame {0} underflows")]
    RefCountUnderflow(PhysicalAddress),
}
