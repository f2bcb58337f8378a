//! # Kernel Physical Frame Allocation
//!
//! This crate owns the pool of 4 KiB physical frames that remain after the
//! kernel image is loaded and hands them to the rest of the kernel: page-table
//! pages and user pages for the virtual memory manager, kernel stacks for the
//! process lifecycle, and pipe buffers.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │   VMM / process lifecycle / pipes (callers)         │
//! │    • allocate / release                             │
//! │    • increment / decrement on copy-on-write fork    │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Frame Allocator ([`frame_alloc`])         │
//! │    • one spin lock, interrupts masked               │
//! │    • contract checks, fatal on violation            │
//! │    • sentinel fill on release                       │
//! └───────┬─────────────────────────────┬───────────────┘
//!         │                             │
//! ┌───────▼─────────────────┐ ┌─────────▼───────────────┐
//! │ Frame Table             │ │ Physical Mapper         │
//! │ • per-frame ref counts  │ │ ([`phys_mapper`])       │
//! │ • index-based free list │ │ • HHDM in the kernel    │
//! └─────────────────────────┘ └─────────────────────────┘
//! ```
//!
//! ## Ownership model
//!
//! A frame is owned by the set of virtual mappings that point to it; its
//! reference count is the size of that set. The allocator only counts, it does
//! not record *which* mappings hold a frame, so callers must pair every
//! `allocate`/`increment` with exactly one `release`/`decrement`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_alloc::frames::{FRAMES, init_frames};
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! // At boot, once the HHDM is in place.
//! let stats = init_frames(PhysicalAddress::new(0x0040_1234)).unwrap();
//! assert_eq!(FRAMES.count_free(), stats.free);
//!
//! // Share a frame between parent and child on fork ...
//! let frame = FRAMES.allocate().expect("out of memory");
//! FRAMES.increment(frame);
//! // ... the child unmaps it again ...
//! FRAMES.release(frame);
//! // ... and the parent drops the last reference.
//! FRAMES.release(frame);
//! ```
//!
//! ## Integration Points
//!
//! * **kernel-info**: `PHYS_TOP`, `MAX_PHYS_FRAMES` and `HHDM_BASE`
//! * **kernel-memory-addresses**: typed physical addresses and frame indices
//! * **kernel-sync**: the spin lock guarding the frame table

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod error;
pub mod frame_alloc;
mod frame_table;
pub mod frames;
pub mod phys_mapper;

pub use error::{FrameAllocInitError, FrameError};
pub use frame_alloc::{FREED_FRAME_FILL, Frame, FrameAlloc, FrameAllocator, FrameStats, Released};
