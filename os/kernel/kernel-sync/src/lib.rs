//! # Kernel synchronization primitives
//!
//! A test-and-test-and-set [`SpinLock`] with RAII guards, plus
//! [`SpinLock::lock_irq`] which additionally masks interrupts for the lifetime
//! of the guard so an interrupt handler cannot spin on a lock held by the code
//! it interrupted.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::IrqGuard;
pub use spin_lock::{IrqSpinLockGuard, SpinLock, SpinLockGuard};
