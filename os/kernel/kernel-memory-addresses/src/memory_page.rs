use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::marker::PhantomData;

/// A page base address (lower `S::SHIFT` bits are zero).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryPage<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S> fmt::Display for MemoryPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.value, S::as_str())
    }
}

impl<S: PageSize> MemoryPage<S> {
    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        let value = addr.as_u64() & !(S::SIZE - 1);
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// Page starting exactly at `addr`, or `None` if `addr` is not aligned to `S`.
    #[inline]
    #[must_use]
    pub const fn try_from_aligned(addr: MemoryAddress) -> Option<Self> {
        if addr.is_aligned::<S>() {
            Some(Self::from_addr(addr))
        } else {
            None
        }
    }

    /// Page with frame number `index`, i.e. base `index << S::SHIFT`.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u64) -> Self {
        Self {
            value: index << S::SHIFT,
            _phantom: PhantomData,
        }
    }

    /// Return the base as `MemoryAddress`.
    #[inline]
    #[must_use]
    pub const fn base(self) -> MemoryAddress {
        MemoryAddress::new(self.value)
    }

    /// Frame number of this page (`base >> S::SHIFT`).
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> u64 {
        self.value >> S::SHIFT
    }
}

impl<S: PageSize> fmt::Debug for MemoryPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryPage<{}>(0x{:016X})",
            core::any::type_name::<S>(),
            self.value
        )
    }
}
