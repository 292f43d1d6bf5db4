//! Virtual-memory syscalls (spec §4.3, §6): `new_pages`/`remove_pages`,
//! thin wrappers over [`crate::mm::vmm`] that add the per-task
//! reservation bookkeeping `vmm` itself is agnostic to.

use crate::error::KernelResult;
use crate::mm::{page_table, vmm};
use crate::sched;
use crate::syscall::read_arg;

/// `vmm::new_pages` maps eagerly page by page and has no reason to know
/// about pages mapped by an unrelated syscall; the "must not overlap an
/// existing mapping" rule (spec §4.3) is checked here instead.
fn range_is_free(dir_phys: usize, base: u32, len: usize) -> bool {
    if base as usize % page_table::PAGE_SIZE != 0
        || len == 0
        || len % page_table::PAGE_SIZE != 0
    {
        return false;
    }
    let page_count = len / page_table::PAGE_SIZE;
    for i in 0..page_count {
        let vaddr = base.wrapping_add((i * page_table::PAGE_SIZE) as u32);
        if page_table::lookup(dir_phys, vaddr).is_some() {
            return false;
        }
    }
    true
}

pub fn new_pages_syscall(args: u32) -> KernelResult<u32> {
    let base = read_arg(args, 0)?;
    let len = read_arg(args, 1)? as usize;

    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("new_pages with no current thread"))?;
    let dir_phys = *tcb.cr3.lock() as usize;

    if !range_is_free(dir_phys, base, len) {
        return Err(crate::invalid_arg!(
            "new_pages: range overlaps an existing mapping or is malformed"
        ));
    }

    let reservation = vmm::new_pages(dir_phys, base, len)?;
    tcb.task.guarded.lock().zfod_reservations.push(reservation);
    Ok(0)
}

pub fn remove_pages_syscall(args: u32) -> KernelResult<u32> {
    let base = read_arg(args, 0)?;

    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("remove_pages with no current thread"))?;
    let dir_phys = *tcb.cr3.lock() as usize;

    let mut guarded = tcb.task.guarded.lock();
    vmm::remove_pages(dir_phys, &mut guarded.zfod_reservations, base)?;
    Ok(0)
}
