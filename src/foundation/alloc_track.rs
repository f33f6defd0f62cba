//! Allocator call counting for the frame path.
//!
//! Compiled only with the `alloc-track` feature, which installs an instrumented global
//! allocator. The counters are process-wide: a measurement is only exact while no other thread
//! touches the heap.

use stats_alloc::{INSTRUMENTED_SYSTEM, Region, StatsAlloc};
use std::alloc::System;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

/// Allocator calls observed by [`count_allocations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// `alloc` calls.
    pub allocations: usize,
    /// `dealloc` calls.
    pub deallocations: usize,
    /// `realloc` calls.
    pub reallocations: usize,
}

/// Run `f` and report the allocator calls made while it ran.
pub fn count_allocations<R>(f: impl FnOnce() -> R) -> (R, AllocStats) {
    let region = Region::new(GLOBAL);
    let out = f();
    let change = region.change();
    let stats = AllocStats {
        allocations: change.allocations,
        deallocations: change.deallocations,
        reallocations: change.reallocations,
    };
    (out, stats)
}
