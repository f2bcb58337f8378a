//! # Reference-counted physical frame allocator
//!
//! Hands out 4 KiB physical frames from the range between the end of the
//! kernel image and the top of physical memory, and tracks for every frame how
//! many owners (virtual mappings) currently reference it. A frame returns to
//! the free pool only when its last owner releases it, which is what makes
//! sharing frames between address spaces during copy-on-write fork safe.
//!
//! ## Frame lifecycle
//!
//! ```text
//!            allocate                increment
//!  FREE ───────────────► OWNED(1) ───────────────► OWNED(n)
//!  (count 0,               ▲  │                      │
//!   on free list)          │  │ release              │ decrement / release
//!    ▲                     │  ▼                      ▼
//!    └──────────────── count ≤ 1 ◄────────────── OWNED(n-1)
//!       sentinel fill
//! ```
//!
//! * [`allocate`](FrameAllocator::allocate) pops a frame and sets its count to 1.
//! * [`increment`](FrameAllocator::increment) / [`decrement`](FrameAllocator::decrement)
//!   add or remove an owner. `decrement` never frees, even at zero.
//! * [`release`](FrameAllocator::release) removes an owner if the frame is
//!   shared; otherwise it fills the frame with [`FREED_FRAME_FILL`] and pushes
//!   it back onto the free list.
//!
//! Frames are **not** zeroed on allocation.
//!
//! ## Contract violations
//!
//! Misaligned or out-of-range addresses, double frees and count
//! under/overflows are caller bugs. The `try_*` operations report them as
//! [`FrameError`]; [`release`](FrameAllocator::release),
//! [`increment`](FrameAllocator::increment) and
//! [`decrement`](FrameAllocator::decrement) log the error and panic. All
//! checks run before any state is touched.
//!
//! ## Locking
//!
//! Every operation runs under one [`SpinLock`] taken with interrupts masked.
//! Never call into the allocator while already holding its lock.

use crate::error::{FrameAllocInitError, FrameError};
use crate::frame_table::FrameTable;
use crate::phys_mapper::PhysMapper;
use core::ops::Range;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::SpinLock;
use log::{debug, error, info};

/// A 4 KiB physical frame as handed out by the allocator.
pub type Frame = PhysicalPage<Size4K>;

/// Byte pattern written over every frame returned to the free list, so that a
/// dangling use of a freed frame reads loud garbage instead of plausible data.
pub const FREED_FRAME_FILL: u8 = 0x01;

#[allow(clippy::cast_possible_truncation)]
const FRAME_BYTES: usize = Size4K::SIZE as usize;

/// Snapshot of the allocator's accounting.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames in the managed range.
    pub total: usize,
    /// Frames currently on the free list.
    pub free: usize,
}

impl FrameStats {
    #[must_use]
    pub const fn in_use(&self) -> usize {
        self.total - self.free
    }
}

/// What a successful release did to the frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Released {
    /// The frame is still referenced by `owners` other owners.
    Shared { owners: u32 },
    /// The last owner let go; the frame is back on the free list.
    Freed,
}

/// Allocator for 4 KiB physical frames with per-frame reference counts.
///
/// `N` is the capacity of the frame table; it must cover every frame index
/// below the top of physical memory passed to [`init`](Self::init).
///
/// The allocator is built `const` so it can live in a `static` and is
/// initialized once at boot:
///
/// ```rust,no_run
/// use kernel_alloc::frame_alloc::FrameAllocator;
/// use kernel_alloc::phys_mapper::HhdmPhysMapper;
/// use kernel_memory_addresses::PhysicalAddress;
///
/// static FRAMES: FrameAllocator<HhdmPhysMapper, 1024> = FrameAllocator::new(HhdmPhysMapper);
///
/// FRAMES
///     .init(PhysicalAddress::new(0x0020_0000), PhysicalAddress::new(0x0040_0000))
///     .unwrap();
/// let frame = FRAMES.allocate().unwrap();
/// FRAMES.release(frame);
/// ```
pub struct FrameAllocator<M, const N: usize> {
    mapper: M,
    table: SpinLock<FrameTable<N>>,
}

impl<M: PhysMapper, const N: usize> FrameAllocator<M, N> {
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self {
            mapper,
            table: SpinLock::new(FrameTable::new()),
        }
    }

    /// Frame table capacity in frames.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Establish the free pool over `[round_up(kernel_end), phys_top)`.
    ///
    /// Every frame in range starts with zero owners and is seeded onto the
    /// free list through the same path [`release`](Self::release) takes, so
    /// each managed frame is filled with [`FREED_FRAME_FILL`]. Only whole
    /// frames below `phys_top` are managed.
    ///
    /// # Errors
    /// - [`FrameAllocInitError::AlreadyInitialized`] on a second call.
    /// - [`FrameAllocInitError::EmptyRange`] if no whole frame lies in the range.
    /// - [`FrameAllocInitError::CapacityExceeded`] if `phys_top` is beyond
    ///   what the table can index.
    pub fn init(
        &self,
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    ) -> Result<FrameStats, FrameAllocInitError> {
        let mut table = self.table.lock_irq();
        if table.is_initialized() {
            return Err(FrameAllocInitError::AlreadyInitialized);
        }

        let indices = Self::managed_indices(kernel_end, phys_top)?;
        table.reset(indices.start, indices.end);
        for index in indices {
            self.reclaim(&mut table, index);
        }

        let stats = Self::stats_of(&table);
        let range = Self::range_of(&table);
        drop(table);

        info!(
            "Frame allocator managing {} frames ({} KiB) at {}..{}",
            stats.total,
            stats.total * FRAME_BYTES / 1024,
            range.start,
            range.end
        );
        Ok(stats)
    }

    fn managed_indices(
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    ) -> Result<Range<u32>, FrameAllocInitError> {
        let empty = FrameAllocInitError::EmptyRange {
            kernel_end,
            phys_top,
        };
        let exceeded = FrameAllocInitError::CapacityExceeded {
            phys_top,
            capacity: N,
        };

        if kernel_end >= phys_top {
            return Err(empty);
        }
        let first = kernel_end.align_up::<Size4K>().ok_or(empty)?;
        let start = first.page::<Size4K>().index();
        let end = phys_top.page::<Size4K>().index();
        if start >= end {
            return Err(empty);
        }
        if end > N as u64 {
            return Err(exceeded);
        }

        let start = u32::try_from(start).map_err(|_| exceeded)?;
        let end = u32::try_from(end).map_err(|_| exceeded)?;
        Ok(start..end)
    }

    /// Take one frame off the free list, owned once.
    ///
    /// Returns `None` when no frame is free; running out is not fatal, the
    /// caller decides how to fail. The frame's contents are left as they were.
    pub fn allocate(&self) -> Option<Frame> {
        let mut table = self.table.lock_irq();
        let Some(index) = table.pop() else {
            drop(table);
            debug!("Frame allocator exhausted");
            return None;
        };
        table.set_refs(index, 1);
        Some(Frame::from_index(u64::from(index)))
    }

    /// Drop one owner of `frame`, returning it to the free list if it was the last.
    ///
    /// # Panics
    /// On any [`FrameError`], see [`try_release`](Self::try_release).
    #[track_caller]
    pub fn release(&self, frame: impl Into<PhysicalAddress>) {
        if let Err(e) = self.try_release(frame) {
            fatal("release", e);
        }
    }

    /// Fallible form of [`release`](Self::release).
    ///
    /// A frame with more than one owner loses one owner. A frame with one
    /// owner, or with none left after [`decrement`](Self::decrement), is filled
    /// with [`FREED_FRAME_FILL`] and pushed onto the free list.
    ///
    /// # Errors
    /// Range and alignment violations, and [`FrameError::DoubleFree`] if the
    /// frame is already on the free list. Nothing is modified on error.
    pub fn try_release(&self, frame: impl Into<PhysicalAddress>) -> Result<Released, FrameError> {
        let addr = frame.into();
        let mut table = self.table.lock_irq();
        let index = Self::index_of(&table, addr)?;
        if table.is_linked(index) {
            return Err(FrameError::DoubleFree(addr));
        }

        let refs = table.refs(index);
        if refs > 1 {
            table.set_refs(index, refs - 1);
            return Ok(Released::Shared { owners: refs - 1 });
        }

        self.reclaim(&mut table, index);
        Ok(Released::Freed)
    }

    /// Add an owner to an allocated frame.
    ///
    /// # Panics
    /// On any [`FrameError`], see [`try_increment`](Self::try_increment).
    #[track_caller]
    pub fn increment(&self, frame: impl Into<PhysicalAddress>) {
        if let Err(e) = self.try_increment(frame) {
            fatal("increment", e);
        }
    }

    /// Fallible form of [`increment`](Self::increment); returns the new count.
    ///
    /// # Errors
    /// Range and alignment violations, [`FrameError::NotAllocated`] for a frame
    /// on the free list, [`FrameError::RefCountOverflow`].
    pub fn try_increment(&self, frame: impl Into<PhysicalAddress>) -> Result<u32, FrameError> {
        let addr = frame.into();
        let mut table = self.table.lock_irq();
        let index = Self::index_of(&table, addr)?;
        if table.is_linked(index) {
            return Err(FrameError::NotAllocated(addr));
        }
        let refs = table
            .refs(index)
            .checked_add(1)
            .ok_or(FrameError::RefCountOverflow(addr))?;
        table.set_refs(index, refs);
        Ok(refs)
    }

    /// Remove an owner from an allocated frame without ever freeing it.
    ///
    /// Whoever performs the final cleanup calls [`release`](Self::release)
    /// instead.
    ///
    /// # Panics
    /// On any [`FrameError`], see [`try_decrement`](Self::try_decrement).
    #[track_caller]
    pub fn decrement(&self, frame: impl Into<PhysicalAddress>) {
        if let Err(e) = self.try_decrement(frame) {
            fatal("decrement", e);
        }
    }

    /// Fallible form of [`decrement`](Self::decrement); returns the new count.
    ///
    /// # Errors
    /// Range and alignment violations, [`FrameError::NotAllocated`] for a frame
    /// on the free list, [`FrameError::RefCountUnderflow`] if the count is
    /// already zero.
    pub fn try_decrement(&self, frame: impl Into<PhysicalAddress>) -> Result<u32, FrameError> {
        let addr = frame.into();
        let mut table = self.table.lock_irq();
        let index = Self::index_of(&table, addr)?;
        if table.is_linked(index) {
            return Err(FrameError::NotAllocated(addr));
        }
        let refs = table
            .refs(index)
            .checked_sub(1)
            .ok_or(FrameError::RefCountUnderflow(addr))?;
        table.set_refs(index, refs);
        Ok(refs)
    }

    /// Current number of owners of a managed frame (zero for free frames).
    ///
    /// # Errors
    /// Range and alignment violations.
    pub fn ref_count(&self, frame: impl Into<PhysicalAddress>) -> Result<u32, FrameError> {
        let addr = frame.into();
        let table = self.table.lock_irq();
        let index = Self::index_of(&table, addr)?;
        Ok(table.refs(index))
    }

    /// Number of frames on the free list.
    pub fn count_free(&self) -> usize {
        self.table.lock_irq().free_count()
    }

    pub fn stats(&self) -> FrameStats {
        Self::stats_of(&self.table.lock_irq())
    }

    /// Physical range of managed frames; empty before [`init`](Self::init).
    pub fn managed_range(&self) -> Range<PhysicalAddress> {
        Self::range_of(&self.table.lock_irq())
    }

    pub fn is_initialized(&self) -> bool {
        self.table.lock_irq().is_initialized()
    }

    /// Fill a frame with the sentinel and put it on the free list with zero owners.
    ///
    /// Shared by [`init`](Self::init) and [`try_release`](Self::try_release).
    fn reclaim(&self, table: &mut FrameTable<N>, index: u32) {
        let frame = Frame::from_index(u64::from(index));
        // SAFETY: the frame is managed by this allocator and has no owners
        // left; the lock is held, so nothing else touches it.
        let bytes: &mut [u8; FRAME_BYTES] = unsafe { self.mapper.phys_to_mut(frame.base()) };
        bytes.fill(FREED_FRAME_FILL);
        table.push(index);
    }

    fn index_of(table: &FrameTable<N>, addr: PhysicalAddress) -> Result<u32, FrameError> {
        if !table.is_initialized() {
            return Err(FrameError::Uninitialized);
        }
        if !addr.is_aligned::<Size4K>() {
            return Err(FrameError::Misaligned(addr));
        }

        let Range { start, end } = Self::range_of(table);
        if addr < start {
            return Err(FrameError::BelowRange { addr, start });
        }
        if addr >= end {
            return Err(FrameError::AboveRange { addr, end });
        }
        u32::try_from(addr.page::<Size4K>().index()).map_err(|_| FrameError::AboveRange { addr, end })
    }

    fn range_of(table: &FrameTable<N>) -> Range<PhysicalAddress> {
        let Range { start, end } = table.range();
        Frame::from_index(u64::from(start)).base()..Frame::from_index(u64::from(end)).base()
    }

    const fn stats_of(table: &FrameTable<N>) -> FrameStats {
        FrameStats {
            total: table.total(),
            free: table.free_count(),
        }
    }
}

#[cold]
#[track_caller]
fn fatal(op: &str, err: FrameError) -> ! {
    error!("Frame allocator contract violated in {op}: {err}");
    panic!("{op}: {err}");
}

/// Frame source used by page-table and address-space code.
pub trait FrameAlloc {
    /// Allocate one 4 KiB *physical* frame. Must return page-aligned frames.
    fn alloc_4k(&mut self) -> Option<Frame>;

    /// Give up one reference to a frame obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, frame: Frame);
}

impl<M: PhysMapper, const N: usize> FrameAlloc for &FrameAllocator<M, N> {
    fn alloc_4k(&mut self) -> Option<Frame> {
        self.allocate()
    }

    #[track_caller]
    fn free_4k(&mut self, frame: Frame) {
        self.release(frame);
    }
}
