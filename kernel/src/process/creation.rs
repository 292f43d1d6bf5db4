//! Boot-time first-task creation (spec §4.7 "First task").
//!
//! Builds the init task's PCB/TCB, a fresh page directory, loads every
//! `PT_LOAD` segment of the named catalog executable into freshly mapped
//! user pages, and crafts the trap frame that `iret`s into it. Grounded
//! on `original_source/kern/kernel.c`'s bring-up sequence for the first
//! task.

use alloc::alloc::{alloc, dealloc, Layout};
use alloc::sync::Arc;

use crate::arch::x86::usermode;
use crate::elf;
use crate::error::{KernelError, KernelResult};
use crate::mm::{frame_allocator, page_table};
use crate::process::pcb::Pcb;
use crate::process::table;
use crate::sched;
use crate::sched::task::Tcb;

/// Top of the user stack page, one page below the 4 GiB boundary (spec
/// §4.7 "the top of the task's user stack").
pub const USER_STACK_TOP: u32 = 0xFFFF_F000;

pub const KERNEL_STACK_SIZE: usize = 4096;

fn kernel_stack_layout() -> Layout {
    Layout::from_size_align(KERNEL_STACK_SIZE, KERNEL_STACK_SIZE)
        .expect("kernel stack layout is a fixed power-of-two size")
}

/// Allocates one page-aligned kernel stack from the kernel heap, which
/// lives below the 16 MiB identity-mapped region and so stays valid no
/// matter which task's `cr3` is loaded. Returns the stack's top address,
/// the value installed directly as `esp0` (spec §3 "kernel-stack base").
pub fn allocate_kernel_stack() -> KernelResult<usize> {
    // SAFETY: layout is a fixed nonzero power-of-two size/align.
    let base = unsafe { alloc(kernel_stack_layout()) };
    if base.is_null() {
        return Err(KernelError::OutOfResource {
            requested: 1,
            available: 0,
        });
    }
    Ok(base as usize + KERNEL_STACK_SIZE)
}

/// Frees a kernel stack previously returned by `allocate_kernel_stack`.
/// Called only by the garbage collector, never by the thread standing on
/// that stack (spec §3 lifecycle note).
pub fn free_kernel_stack(kernel_stack_base: usize) {
    let base_ptr = (kernel_stack_base - KERNEL_STACK_SIZE) as *mut u8;
    // SAFETY: `kernel_stack_base` was returned by `allocate_kernel_stack`
    // and is freed exactly once, from the garbage collector, after the
    // owning thread can no longer run.
    unsafe { dealloc(base_ptr, kernel_stack_layout()) };
}

/// Creates the boot init task from a catalog executable, registers it in
/// both global tables, and makes its thread runnable.
pub fn create_first_task(execname: &str) -> KernelResult<()> {
    let (bytes, _len) = crate::catalog::lookup(execname).ok_or(KernelError::NotFound {
        what: "catalog executable",
    })?;
    let header = elf::parse_header(bytes).map_err(|_| KernelError::InvalidArg {
        reason: "malformed ELF header",
    })?;

    let dir_phys = page_table::new_directory()?;
    for segment in elf::load_segments(bytes, &header).map_err(|_| KernelError::InvalidArg {
        reason: "malformed program headers",
    })? {
        map_segment(dir_phys, bytes, &segment)?;
    }

    let stack_frame = frame_allocator::allocate_frame()?;
    page_table::map_user_frame(
        dir_phys,
        USER_STACK_TOP - page_table::PAGE_SIZE as u32,
        stack_frame,
        true,
    )?;

    let task_id = table::next_task_id();
    let tid = sched::next_tid();
    let pcb = Pcb::new(task_id, tid, dir_phys as u32, None);
    table::register(pcb.clone());
    table::set_init_task(pcb.clone());

    let kernel_stack_top = allocate_kernel_stack()?;
    let frame = usermode::fresh_trap_frame(header.entry, USER_STACK_TOP, 0);
    let esp = usermode::craft_initial_kernel_stack(kernel_stack_top, frame);

    let tcb = Arc::new(Tcb::new(tid, pcb, kernel_stack_top, dir_phys as u32));
    *tcb.saved_esp.lock() = esp;
    sched::register_tcb(tcb);
    sched::add_runnable(tid)?;
    Ok(())
}

/// Maps and populates every page backing one `PT_LOAD` segment.
pub fn map_segment(dir_phys: usize, bytes: &[u8], segment: &elf::LoadSegment) -> KernelResult<()> {
    let start_page = segment.vaddr & !0xFFF;
    let end = segment.vaddr + segment.mem_size;
    let mut vaddr = start_page;
    while vaddr < end {
        let frame = frame_allocator::allocate_frame()?;
        page_table::map_user_frame(dir_phys, vaddr, frame, segment.writable)?;
        copy_segment_page(frame, vaddr, bytes, segment);
        vaddr += page_table::PAGE_SIZE as u32;
    }
    Ok(())
}

/// Copies one page's worth of file content (zero-padding past
/// `file_size`, i.e. the bss tail) into `frame_phys` via the scratch
/// mapping.
fn copy_segment_page(frame_phys: usize, page_vaddr: u32, bytes: &[u8], segment: &elf::LoadSegment) {
    let dst_ptr = page_table::map_scratch(frame_phys);
    // SAFETY: `map_scratch` just pointed the scratch slot at `frame_phys`,
    // a freshly allocated frame not yet referenced by any other mapping.
    let dst = unsafe { core::slice::from_raw_parts_mut(dst_ptr, page_table::PAGE_SIZE) };
    dst.fill(0);
    for (i, slot) in dst.iter_mut().enumerate() {
        let byte_vaddr = page_vaddr.wrapping_add(i as u32);
        if byte_vaddr < segment.vaddr || byte_vaddr >= segment.vaddr + segment.file_size {
            continue;
        }
        let file_index = (segment.file_offset + (byte_vaddr - segment.vaddr)) as usize;
        if let Some(&byte) = bytes.get(file_index) {
            *slot = byte;
        }
    }
}
