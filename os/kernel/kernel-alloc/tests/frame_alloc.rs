mod common;

use common::{FRAME, KERNEL_END, PHYS_TOP, TestAllocator, TestRam, four_frames};
use kernel_alloc::{
    FREED_FRAME_FILL, Frame, FrameAlloc, FrameAllocInitError, FrameAllocator, FrameError,
    FrameStats, Released,
};
use kernel_memory_addresses::PhysicalAddress;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

const FRAME_BYTES: usize = 4096;

fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

/// Every managed frame that has owners, with its owner count.
fn owned_frames(alloc: &TestAllocator) -> Vec<(u64, u32)> {
    let range = alloc.managed_range();
    (range.start.as_u64()..range.end.as_u64())
        .step_by(FRAME_BYTES)
        .map(|a| (a, alloc.ref_count(pa(a)).unwrap()))
        .filter(|&(_, refs)| refs > 0)
        .collect()
}

#[test]
fn init_seeds_every_whole_frame() {
    let alloc = FrameAllocator::<_, 8>::new(TestRam::new(PHYS_TOP));
    let stats = alloc.init(pa(KERNEL_END), pa(PHYS_TOP)).unwrap();

    assert_eq!(stats, FrameStats { total: 4, free: 4 });
    assert_eq!(alloc.count_free(), 4);
    assert_eq!(alloc.managed_range(), pa(0x2000)..pa(0x6000));
    assert!(alloc.is_initialized());
    for a in (0x2000..0x6000).step_by(4096) {
        assert_eq!(alloc.ref_count(pa(a)), Ok(0));
    }
}

#[test]
fn init_fills_managed_frames_only() {
    let alloc = four_frames();
    let ram = alloc.mapper();

    assert!(ram.read(pa(0), 0x2000).iter().all(|&b| b == 0), "kernel image touched");
    assert!(ram.read(pa(0x2000), 0x4000).iter().all(|&b| b == FREED_FRAME_FILL));
}

#[test]
fn aligned_kernel_end_is_the_first_frame() {
    let alloc = FrameAllocator::<_, 8>::new(TestRam::new(PHYS_TOP));
    let stats = alloc.init(pa(0x2000), pa(PHYS_TOP)).unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(alloc.managed_range().start, pa(0x2000));
}

#[test]
fn partial_trailing_frame_is_not_managed() {
    let alloc = FrameAllocator::<_, 8>::new(TestRam::new(0x7000));
    let stats = alloc.init(pa(KERNEL_END), pa(0x6800)).unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(alloc.managed_range().end, pa(0x6000));
    assert!(alloc.mapper().read(pa(0x6000), 0x1000).iter().all(|&b| b == 0));
}

#[test]
fn second_init_is_rejected() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();

    assert_eq!(
        alloc.init(pa(KERNEL_END), pa(PHYS_TOP)),
        Err(FrameAllocInitError::AlreadyInitialized)
    );
    assert_eq!(alloc.count_free(), 3);
    assert_eq!(alloc.ref_count(frame), Ok(1));
}

#[test]
fn init_rejects_empty_ranges() {
    let alloc = FrameAllocator::<_, 8>::new(TestRam::new(PHYS_TOP));
    assert_eq!(
        alloc.init(pa(PHYS_TOP), pa(PHYS_TOP)),
        Err(FrameAllocInitError::EmptyRange {
            kernel_end: pa(PHYS_TOP),
            phys_top: pa(PHYS_TOP),
        })
    );
    assert_eq!(
        alloc.init(pa(0x5800), pa(PHYS_TOP)),
        Err(FrameAllocInitError::EmptyRange {
            kernel_end: pa(0x5800),
            phys_top: pa(PHYS_TOP),
        })
    );
    assert!(!alloc.is_initialized());
    assert!(alloc.init(pa(KERNEL_END), pa(PHYS_TOP)).is_ok());
}

#[test]
fn init_rejects_top_beyond_table_capacity() {
    let alloc = FrameAllocator::<_, 4>::new(TestRam::new(PHYS_TOP));
    assert_eq!(
        alloc.init(pa(KERNEL_END), pa(PHYS_TOP)),
        Err(FrameAllocInitError::CapacityExceeded {
            phys_top: pa(PHYS_TOP),
            capacity: 4,
        })
    );
    assert_eq!(alloc.count_free(), 0);
}

#[test]
fn four_frame_scenario() {
    let alloc = four_frames();
    assert_eq!(alloc.count_free(), 4);

    let frames: Vec<Frame> = (0..3).map(|_| alloc.allocate().unwrap()).collect();
    assert_eq!(alloc.count_free(), 1);

    let distinct: HashSet<_> = frames.iter().map(|f| f.base()).collect();
    assert_eq!(distinct.len(), 3);
    for f in &frames {
        assert!(f.base().is_aligned::<kernel_memory_addresses::Size4K>());
        assert!(alloc.managed_range().contains(&f.base()));
    }

    alloc.release(frames[1]);
    assert_eq!(alloc.count_free(), 2);

    assert_eq!(alloc.allocate(), Some(frames[1]));
    assert_eq!(alloc.count_free(), 1);
}

#[test]
fn allocate_release_restores_free_count() {
    let alloc = four_frames();
    let before = alloc.count_free();

    let frame = alloc.allocate().unwrap();
    assert_eq!(alloc.ref_count(frame), Ok(1));
    alloc.release(frame);

    assert_eq!(alloc.count_free(), before);
    assert_eq!(alloc.ref_count(frame), Ok(0));
    // LIFO: the frame just released is the next one handed out.
    assert_eq!(alloc.allocate(), Some(frame));
}

#[test]
fn shared_frame_survives_decrement() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();

    alloc.increment(frame);
    assert_eq!(alloc.ref_count(frame), Ok(2));

    alloc.decrement(frame);
    assert_eq!(alloc.ref_count(frame), Ok(1));
    assert_eq!(alloc.count_free(), 3, "decrement must not free");

    alloc.release(frame);
    assert_eq!(alloc.ref_count(frame), Ok(0));
    assert_eq!(alloc.count_free(), 4);
}

#[test]
fn release_of_shared_frame_keeps_contents() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    alloc.mapper().fill(frame, FRAME_BYTES, 0xAB);
    alloc.increment(frame);

    assert_eq!(alloc.try_release(frame), Ok(Released::Shared { owners: 1 }));
    assert_eq!(alloc.count_free(), 3);
    assert!(alloc.mapper().read(frame, FRAME_BYTES).iter().all(|&b| b == 0xAB));

    assert_eq!(alloc.try_release(frame), Ok(Released::Freed));
    assert_eq!(alloc.count_free(), 4);
}

#[test]
fn released_frame_is_filled_with_sentinel() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    alloc.mapper().fill(frame, FRAME_BYTES, 0xAB);

    alloc.release(frame);

    let bytes = alloc.mapper().read(frame, FRAME_BYTES);
    assert!(bytes.iter().all(|&b| b == FREED_FRAME_FILL));
}

#[test]
fn allocate_does_not_zero() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    assert!(alloc.mapper().read(frame, FRAME_BYTES).iter().all(|&b| b == FREED_FRAME_FILL));
}

#[test]
fn exhaustion_returns_none_one_past_the_pool() {
    let alloc = four_frames();
    let range = alloc.managed_range();

    let mut seen = HashSet::new();
    for _ in 0..4 {
        let frame = alloc.allocate().unwrap();
        assert!(range.contains(&frame.base()));
        assert!(seen.insert(frame));
    }
    assert_eq!(alloc.allocate(), None);
    assert_eq!(alloc.allocate(), None);
    assert_eq!(alloc.count_free(), 0);

    let first = *seen.iter().next().unwrap();
    alloc.release(first);
    assert_eq!(alloc.allocate(), Some(first));
}

#[test]
fn counted_frames_are_never_on_the_free_list() {
    let alloc = four_frames();
    let a = alloc.allocate().unwrap();
    let b = alloc.allocate().unwrap();
    alloc.increment(b);
    alloc.release(a);

    let owned = owned_frames(&alloc);
    assert_eq!(owned, vec![(b.base().as_u64(), 2)]);
    assert_eq!(alloc.count_free(), 4 - owned.len());

    // Drain the pool: b must never come back while it has owners.
    while let Some(f) = alloc.allocate() {
        assert_ne!(f, b);
    }
}

#[test]
fn decrement_to_zero_then_release_reclaims() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();

    assert_eq!(alloc.try_decrement(frame), Ok(0));
    assert_eq!(alloc.count_free(), 3, "a frame without owners stays off the list");

    assert_eq!(alloc.try_release(frame), Ok(Released::Freed));
    assert_eq!(alloc.count_free(), 4);
}

#[test]
fn frame_alloc_trait_uses_the_allocator() {
    let alloc = four_frames();
    let mut source = &alloc;

    let frame = source.alloc_4k().unwrap();
    assert_eq!(alloc.count_free(), 3);
    source.free_4k(frame);
    assert_eq!(alloc.count_free(), 4);
}

#[test]
fn try_operations_report_contract_violations() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    let free_frame = (0x2000..0x6000)
        .step_by(4096)
        .map(pa)
        .find(|&a| a != frame.base())
        .unwrap();

    assert_eq!(alloc.try_release(pa(0x2010)), Err(FrameError::Misaligned(pa(0x2010))));
    assert_eq!(
        alloc.try_release(pa(0x1000)),
        Err(FrameError::BelowRange {
            addr: pa(0x1000),
            start: pa(0x2000),
        })
    );
    assert_eq!(
        alloc.try_increment(pa(PHYS_TOP)),
        Err(FrameError::AboveRange {
            addr: pa(PHYS_TOP),
            end: pa(PHYS_TOP),
        })
    );
    assert_eq!(alloc.try_release(free_frame), Err(FrameError::DoubleFree(free_frame)));
    assert_eq!(alloc.try_increment(free_frame), Err(FrameError::NotAllocated(free_frame)));
    assert_eq!(alloc.try_decrement(free_frame), Err(FrameError::NotAllocated(free_frame)));

    assert_eq!(alloc.try_decrement(frame), Ok(0));
    assert_eq!(
        alloc.try_decrement(frame),
        Err(FrameError::RefCountUnderflow(frame.base()))
    );

    assert_eq!(alloc.count_free(), 3);
}

/// Run `f`, expect it to panic, and return the panic message.
fn panic_message(f: impl FnOnce()) -> String {
    let err = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("expected a panic");
    err.downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_default()
}

#[test]
fn faulting_release_leaves_state_untouched() {
    let alloc = four_frames();
    let held = alloc.allocate().unwrap();
    alloc.increment(held);
    let before = (alloc.stats(), owned_frames(&alloc));

    for bad in [0x2001, KERNEL_END, 0x1000, 0, PHYS_TOP, PHYS_TOP + FRAME] {
        let msg = panic_message(|| alloc.release(pa(bad)));
        assert!(msg.starts_with("release: "), "unexpected message {msg:?}");
        assert_eq!((alloc.stats(), owned_frames(&alloc)), before);
    }

    // The lock was not left held by the fatal path.
    let next = alloc.allocate().unwrap();
    assert_ne!(next, held);
}

#[test]
#[should_panic(expected = "is not aligned to a 4 KiB boundary")]
fn release_misaligned_is_fatal() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    alloc.release(frame.base() + 8);
}

#[test]
#[should_panic(expected = "lies below the managed range")]
fn release_below_kernel_end_is_fatal() {
    four_frames().release(pa(0x1000));
}

#[test]
#[should_panic(expected = "at or above the managed range")]
fn release_at_phys_top_is_fatal() {
    four_frames().release(pa(PHYS_TOP));
}

#[test]
#[should_panic(expected = "double free of frame")]
fn double_release_is_fatal() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    alloc.release(frame);
    alloc.release(frame);
}

#[test]
#[should_panic(expected = "underflows")]
fn decrement_below_zero_is_fatal() {
    let alloc = four_frames();
    let frame = alloc.allocate().unwrap();
    alloc.decrement(frame);
    alloc.decrement(frame);
}

#[test]
#[should_panic(expected = "is not allocated")]
fn increment_of_free_frame_is_fatal() {
    four_frames().increment(pa(0x3000));
}

#[test]
#[should_panic(expected = "not initialized")]
fn release_before_init_is_fatal() {
    let alloc = FrameAllocator::<_, 8>::new(TestRam::new(PHYS_TOP));
    alloc.release(pa(0x2000));
}

#[test]
fn ref_count_reports_range_errors() {
    let alloc = four_frames();
    assert_eq!(alloc.ref_count(pa(0x4000)), Ok(0));
    assert_eq!(
        alloc.ref_count(pa(0x0800)),
        Err(FrameError::Misaligned(pa(0x0800)))
    );
}

#[test]
fn stats_track_usage() {
    let alloc = four_frames();
    let a = alloc.allocate().unwrap();
    let _b = alloc.allocate().unwrap();
    assert_eq!(alloc.stats().in_use(), 2);
    alloc.release(a);
    assert_eq!(alloc.stats(), FrameStats { total: 4, free: 3 });
}
