//! ZFOD VM syscalls (spec §4.3): `new_pages`/`remove_pages` and
//! page-fault-time promotion of a reservation to a private frame.
//!
//! Grounded on `original_source/kern/syscalls/pages.c`'s reservation
//! bookkeeping: pages are reserved eagerly against the free-frame
//! counter and only actually backed by a private frame on first write,
//! and a task's live reservations are tracked so `remove_pages` can
//! validate that `base` was the start of a prior `new_pages` call.

use alloc::vec::Vec;

use crate::error::{KernelError, KernelResult};
use crate::mm::{frame_allocator, page_table};

/// One `new_pages` call's worth of bookkeeping, per spec §3 PCB field
/// "list of ZFOD reservations (`{base, page_count}`)".
#[derive(Clone, Copy)]
pub struct Reservation {
    pub base: u32,
    pub page_count: usize,
}

/// Reserves `page_count` pages of ZFOD memory starting at `base` in the
/// given address space, crediting the reservation against the global
/// free-frame counter before mapping anything so the operation cannot
/// partially succeed.
pub fn new_pages(dir_phys: usize, base: u32, len: usize) -> KernelResult<Reservation> {
    if base as usize % page_table::PAGE_SIZE != 0
        || len == 0
        || len % page_table::PAGE_SIZE != 0
    {
        return Err(KernelError::InvalidArg {
            reason: "new_pages: base must be page-aligned and len a positive multiple of page size",
        });
    }
    let page_count = len / page_table::PAGE_SIZE;
    frame_allocator::reserve_frames(page_count)?;

    for i in 0..page_count {
        let vaddr = base.wrapping_add((i * page_table::PAGE_SIZE) as u32);
        if let Err(e) = page_table::map_zfod_reservation(dir_phys, vaddr) {
            // Roll back everything mapped so far plus the reservation.
            for j in 0..i {
                let vaddr = base.wrapping_add((j * page_table::PAGE_SIZE) as u32);
                unmap_one(dir_phys, vaddr);
            }
            frame_allocator::unreserve_frames(page_count);
            return Err(e);
        }
    }
    Ok(Reservation { base, page_count })
}

/// Frees every page in a reservation that began at `base`, releasing
/// whatever frames are actually backing it (private or still-ZFOD) back
/// to the allocator and uncrediting the reservation.
pub fn remove_pages(dir_phys: usize, reservations: &mut Vec<Reservation>, base: u32) -> KernelResult<()> {
    let idx = reservations
        .iter()
        .position(|r| r.base == base)
        .ok_or(KernelError::NotFound {
            what: "zfod reservation base",
        })?;
    let reservation = reservations.remove(idx);

    for i in 0..reservation.page_count {
        let vaddr = base.wrapping_add((i * page_table::PAGE_SIZE) as u32);
        unmap_one(dir_phys, vaddr);
    }
    frame_allocator::unreserve_frames(reservation.page_count);
    Ok(())
}

fn unmap_one(dir_phys: usize, vaddr: u32) {
    if let Some(entry) = page_table::lookup(dir_phys, vaddr) {
        if !entry.is_zfod() {
            frame_allocator::free_frame(entry.frame_addr() as usize);
        }
    }
}

/// Page-fault-time ZFOD resolution (spec §4.9: "attempted against the
/// ZFOD table before being surfaced as exceptions"). Returns `Ok(())` if
/// the fault was a write to a ZFOD page and has been resolved by
/// promoting it to a private frame; `Err` means the caller should fall
/// through to the generic exception path.
pub fn try_resolve_zfod_fault(dir_phys: usize, fault_addr: u32, is_write: bool) -> KernelResult<()> {
    let vaddr = fault_addr & !0xFFF;
    let entry = page_table::lookup(dir_phys, vaddr).ok_or(KernelError::NotFound {
        what: "faulting address not mapped",
    })?;
    if !entry.is_zfod() || !is_write {
        return Err(KernelError::IllegalState {
            reason: "fault is not a resolvable ZFOD write",
        });
    }
    page_table::promote_zfod(dir_phys, vaddr)
}
