//! `thread_fork` (spec §4.7 "thread_fork"): a new thread sharing the
//! calling task's address space.
//!
//! Grounded on `original_source/kern/syscalls/thread_fork.c`: unlike
//! `fork`, no address space is copied -- the new [`Tcb`] shares the
//! task's `cr3` and [`Pcb`] outright, gets its own freshly allocated
//! kernel stack, and resumes at the same user `eip`/`esp` as the parent
//! with `eax = 0`. Replaces the teacher's `Thread`/`ThreadBuilder` pair
//! (per-arch TLS installation, guard pages, independent virtual stack
//! regions), none of which this kernel's single flat address space per
//! task needs.

use alloc::sync::Arc;

use crate::arch::x86::idt::TrapFrame;
use crate::arch::x86::usermode;
use crate::error::KernelResult;
use crate::process::creation;
use crate::sched;
use crate::sched::task::Tcb;

/// Spawns a new thread in the calling task, resuming at the same
/// register state as `parent_frame` but with `eax = 0`. Returns the new
/// thread's tid to install in the caller's `eax`.
pub fn thread_fork(parent_frame: &TrapFrame) -> KernelResult<u32> {
    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("thread_fork with no current thread"))?;
    let task = tcb.task.clone();
    let cr3 = *tcb.cr3.lock();

    task.guarded.lock().live_thread_count += 1;

    let kernel_stack_top = match creation::allocate_kernel_stack() {
        Ok(top) => top,
        Err(e) => {
            task.guarded.lock().live_thread_count -= 1;
            return Err(e);
        }
    };

    let mut child_frame = *parent_frame;
    child_frame.eax = 0;
    let esp = usermode::craft_initial_kernel_stack(kernel_stack_top, child_frame);

    let child_tid = sched::next_tid();
    let child_tcb = Arc::new(Tcb::new(child_tid, task, kernel_stack_top, cr3));
    *child_tcb.saved_esp.lock() = esp;
    sched::register_tcb(child_tcb);
    sched::add_runnable(child_tid)?;

    Ok(child_tid)
}
