//! Memory barrier helpers.
//!
//! x86's memory model is strongly ordered, so a full fence is the only
//! one of these ever needed here (TLB invalidation after a page-table
//! write is handled separately, in [`crate::mm::page_table`]).

/// Full read/write fence. Used around the ready-queue and frame-bitmap
/// mutations described in the spec's concurrency model.
#[inline(always)]
pub fn memory_fence() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
