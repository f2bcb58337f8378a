//! Local interrupt masking.
//!
//! On bare-metal `x86_64` (`target_os = "none"`) these functions issue
//! `cli`/`sti` and read `RFLAGS.IF`. On hosted targets there are no interrupts
//! to mask: [`interrupts_enabled`] reports `false` and the guard is inert, which
//! keeps lock-based code testable under `cargo test`.
//!
//! # Safety & Privilege
//!
//! On bare metal the instructions must run in a context where `cli`/`sti` are
//! legal (ring 0). Calling from user space faults.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod arch {
    /// `RFLAGS.IF`, bit 9.
    const RFLAGS_IF: u64 = 1 << 9;

    #[inline]
    pub fn disable() {
        unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn enable() {
        unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
    }

    #[inline]
    pub fn enabled() -> bool {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
        r & RFLAGS_IF != 0
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod arch {
    #[inline]
    pub const fn disable() {}

    #[inline]
    pub const fn enable() {}

    #[inline]
    pub const fn enabled() -> bool {
        false
    }
}

/// Whether maskable interrupts are currently enabled on this CPU.
#[inline]
#[must_use]
#[allow(clippy::missing_const_for_fn)] // const only on hosted targets
pub fn interrupts_enabled() -> bool {
    arch::enabled()
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// Interrupts are re-enabled on drop **only** if they were enabled when the
/// guard was created, so guards nest.
///
/// ```
/// use kernel_sync::IrqGuard;
///
/// let outer = IrqGuard::new();
/// {
///     let _inner = IrqGuard::new();
/// }
/// drop(outer);
/// ```
pub struct IrqGuard {
    /// Whether interrupts were enabled (IF=1) when the guard was created.
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // const only on hosted targets
    pub fn new() -> Self {
        let enabled = arch::enabled();
        if enabled {
            arch::disable();
        }
        Self {
            were_enabled: enabled,
        }
    }

    /// Whether this guard will re-enable interrupts when dropped.
    #[inline]
    #[must_use]
    pub const fn restores_interrupts(&self) -> bool {
        self.were_enabled
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            arch::enable();
        }
    }
}
