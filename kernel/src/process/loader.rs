//! `exec` (spec §4.7 "exec"): replaces the calling thread's address
//! space and register state with a freshly loaded catalog executable,
//! in place -- same tid, same `Pcb`, new `cr3`.
//!
//! Grounded on `original_source/kern/syscalls/exec.c`: exec is only
//! legal from a single-threaded task (the other threads have no
//! well-defined fate once the address space they ran in disappears).
//! Replaces the teacher's `ElfLoader`/`VirtualAddressSpace` abstractions
//! with the same `elf::{parse_header, load_segments}` +
//! `mm::page_table::map_user_frame` pipeline [`crate::process::creation`]
//! uses for the first task, since loading an ELF image is the same
//! operation whether it is the very first task or a later `exec`.

use crate::arch::x86::idt::TrapFrame;
use crate::arch::x86::mmu;
use crate::arch::x86::usermode;
use crate::catalog;
use crate::elf;
use crate::error::{KernelError, KernelResult};
use crate::mm::{frame_allocator, page_table};
use crate::process::creation;
use crate::sched;

/// Loads `execname` into a fresh address space and overwrites `frame` in
/// place with the new program's initial register state. The caller
/// (the syscall dispatcher) must not touch `frame` again before
/// returning to user mode -- the old address space is already gone.
pub fn exec(frame: &mut TrapFrame, execname: &str) -> KernelResult<()> {
    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("exec with no current thread"))?;
    let task = tcb.task.clone();

    {
        let guarded = task.guarded.lock();
        if guarded.live_thread_count != 1 {
            return Err(crate::illegal_state!("exec requires a single-threaded task"));
        }
    }

    let (bytes, _len) = catalog::lookup(execname).ok_or(KernelError::NotFound {
        what: "catalog executable",
    })?;
    let header =
        elf::parse_header(bytes).map_err(|_| crate::invalid_arg!("malformed ELF header"))?;
    let segments: alloc::vec::Vec<_> = elf::load_segments(bytes, &header)
        .map_err(|_| crate::invalid_arg!("malformed program headers"))?
        .collect();

    let new_dir = page_table::new_directory()?;
    for segment in &segments {
        if let Err(e) = creation::map_segment(new_dir, bytes, segment) {
            page_table::teardown_directory(new_dir, false);
            return Err(e);
        }
    }

    let stack_frame = match frame_allocator::allocate_frame() {
        Ok(f) => f,
        Err(e) => {
            page_table::teardown_directory(new_dir, false);
            return Err(e);
        }
    };
    if let Err(e) = page_table::map_user_frame(
        new_dir,
        creation::USER_STACK_TOP - page_table::PAGE_SIZE as u32,
        stack_frame,
        true,
    ) {
        page_table::teardown_directory(new_dir, false);
        return Err(e);
    }

    let old_dir = task.page_directory() as usize;
    task.set_page_directory(new_dir as u32);
    *tcb.cr3.lock() = new_dir as u32;
    mmu::write_cr3(new_dir as u32);

    // The old directory's frames were owned by this same task and have
    // just been superseded; nothing else references them.
    page_table::teardown_directory(old_dir, false);

    *frame = usermode::fresh_trap_frame(header.entry, creation::USER_STACK_TOP, 0);
    Ok(())
}
