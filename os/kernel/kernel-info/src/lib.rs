//! # Kernel Memory Configuration
//!
//! Compile-time constants describing the kernel's physical and virtual memory
//! layout. They are the single source of truth for the frame allocator's
//! boot-time bounds and for the direct map it uses to touch frame contents.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//! kernel end  ├─────────────────────────────────┤ (rounded up to 4 KiB)
//!             │    Available RAM                │
//!             │  (Managed by frame allocator)   │
//! PHYS_TOP    └─────────────────────────────────┘ 0x0E00_0000 (224 MiB)
//! ```
//!
//! The kernel image end is only known at link time and is passed to the
//! allocator at boot; everything else is fixed here and verified by `const`
//! assertions so an inconsistent layout fails the build instead of the boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
