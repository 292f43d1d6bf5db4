//! `fork` (spec §4.7 "fork"): an eager, full copy of the calling task's
//! address space into a brand-new task with a single thread.
//!
//! Grounded on `original_source/kern/syscalls/fork.c`'s contract: fork is
//! only legal from a single-threaded task, and the child is a deep copy
//! of the parent's memory with every frame duplicated up front rather
//! than shared copy-on-write. Replaces the teacher's `ProcessBuilder`/
//! `ThreadBuilder` clone machinery (capability-space and file-table
//! inheritance this kernel has no equivalent of) with a frame-by-frame
//! physical copy through the scratch mapping
//! (`mm::page_table::map_scratch`), since the parent and child never
//! share `cr3` and a direct pointer copy would read through whichever
//! address space happens to be loaded.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::arch::x86::idt::TrapFrame;
use crate::arch::x86::usermode;
use crate::error::{KernelError, KernelResult};
use crate::mm::{frame_allocator, page_table};
use crate::process::creation;
use crate::process::pcb::Pcb;
use crate::process::table;
use crate::sched;
use crate::sched::task::Tcb;

/// Copies one present user page from the parent's address space into
/// `dst_dir` at the same virtual address. A ZFOD reservation is copied
/// as a reservation (no frame consumed); anything else gets its own
/// freshly allocated, fully copied frame.
fn copy_page(dst_dir: usize, vaddr: u32, entry: page_table::Entry) -> KernelResult<()> {
    if entry.is_zfod() {
        return page_table::map_zfod_reservation(dst_dir, vaddr);
    }

    // The scratch slot is one shared mapping, so the source page has to
    // be staged off to a heap buffer before the slot can be repointed at
    // the freshly allocated destination frame.
    let mut staging = alloc::vec![0u8; page_table::PAGE_SIZE];
    let src_ptr = page_table::map_scratch(entry.frame_addr() as usize);
    // SAFETY: `map_scratch` points the scratch slot at the parent's live,
    // present frame; the read completes before anything else touches it.
    let src = unsafe { core::slice::from_raw_parts(src_ptr, page_table::PAGE_SIZE) };
    staging.copy_from_slice(src);

    let dst_frame = frame_allocator::allocate_frame()?;
    let dst_ptr = page_table::map_scratch(dst_frame);
    // SAFETY: the scratch slot now points at `dst_frame`, just allocated
    // and not yet referenced by any other mapping.
    let dst = unsafe { core::slice::from_raw_parts_mut(dst_ptr, page_table::PAGE_SIZE) };
    dst.copy_from_slice(&staging);

    let writable = entry.flags().contains(page_table::PageFlags::WRITABLE);
    page_table::map_user_frame(dst_dir, vaddr, dst_frame, writable)
}

/// Forks the calling thread's task. On success, returns the child's tid
/// to install in the parent's `eax`; the child thread itself resumes via
/// its own crafted trap frame with `eax = 0`, exactly as an ordinary trap
/// return.
pub fn fork(parent_frame: &TrapFrame) -> KernelResult<u32> {
    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("fork with no current thread"))?;
    let parent_task = tcb.task.clone();

    {
        let guarded = parent_task.guarded.lock();
        if guarded.live_thread_count != 1 {
            return Err(crate::illegal_state!("fork requires a single-threaded task"));
        }
    }

    let child_dir = page_table::new_directory()?;
    let mut copied_frames: Vec<usize> = Vec::new();
    let mut copy_err: Option<KernelError> = None;

    page_table::for_each_user_page(parent_task.page_directory() as usize, |vaddr, entry| {
        if copy_err.is_some() {
            return;
        }
        match copy_page(child_dir, vaddr, entry) {
            Ok(()) => {
                if !entry.is_zfod() {
                    if let Some(new_entry) = page_table::lookup(child_dir, vaddr) {
                        copied_frames.push(new_entry.frame_addr() as usize);
                    }
                }
            }
            Err(e) => copy_err = Some(e),
        }
    });

    if let Some(e) = copy_err {
        for frame in copied_frames {
            frame_allocator::free_frame(frame);
        }
        page_table::teardown_directory(child_dir, false);
        return Err(e);
    }

    let child_task_id = table::next_task_id();
    let child_tid = sched::next_tid();
    let child_pcb = Pcb::new(
        child_task_id,
        child_tid,
        child_dir as u32,
        Some(parent_task.clone()),
    );
    {
        let mut guarded = child_pcb.guarded.lock();
        guarded.zfod_reservations = parent_task.guarded.lock().zfod_reservations.clone();
    }
    table::register(child_pcb.clone());
    parent_task.guarded.lock().live_children.push(child_pcb.clone());

    let kernel_stack_top = match creation::allocate_kernel_stack() {
        Ok(top) => top,
        Err(e) => {
            table::remove(child_task_id);
            page_table::teardown_directory(child_dir, false);
            return Err(e);
        }
    };

    let mut child_frame = *parent_frame;
    child_frame.eax = 0;
    let esp = usermode::craft_initial_kernel_stack(kernel_stack_top, child_frame);

    let child_tcb = Arc::new(Tcb::new(
        child_tid,
        child_pcb,
        kernel_stack_top,
        child_dir as u32,
    ));
    *child_tcb.saved_esp.lock() = esp;
    sched::register_tcb(child_tcb);
    sched::add_runnable(child_tid)?;

    Ok(child_tid)
}
