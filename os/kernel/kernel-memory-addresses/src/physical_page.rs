use crate::{MemoryPage, PageSize, PhysicalAddress};
use core::fmt;

/// Physical frame base for size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical
/// frame of size `S` (`S::SIZE` bytes). It is what the frame allocator hands
/// out, so holding one means the address is known to be aligned.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let frame = PhysicalPage::<Size4K>::from_index(3);
/// assert_eq!(frame.base().as_u64(), 0x3000);
/// assert_eq!(frame.index(), 3);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(pub(crate) MemoryPage<S>);

impl<S: PageSize> PhysicalPage<S> {
    /// Frame starting exactly at `p`, or `None` if `p` is not aligned.
    #[inline]
    #[must_use]
    pub const fn try_from_aligned(p: PhysicalAddress) -> Option<Self> {
        match MemoryPage::try_from_aligned(p.0) {
            Some(page) => Some(Self(page)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_index(index: u64) -> Self {
        Self(MemoryPage::from_index(index))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress(self.0.base())
    }

    /// Frame number (physical address divided by the frame size).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0.index()
    }
}

impl<S> fmt::Display for PhysicalPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>({:#018X})",
            core::any::type_name::<S>(),
            self.0.base().as_u64()
        )
    }
}

impl<S> From<MemoryPage<S>> for PhysicalPage<S>
where
    S: PageSize,
{
    #[inline]
    fn from(p: MemoryPage<S>) -> Self {
        Self(p)
    }
}
