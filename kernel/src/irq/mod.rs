//! Trap dispatch (spec §4.9): the single entry point every exception,
//! IRQ, and syscall stub calls into after building a [`TrapFrame`].
//!
//! Grounded on `original_source/kern/handler_install.c`'s dispatch table
//! and `original_source/kern/syscalls/page_fault.c`'s "try ZFOD first"
//! rule. Replaces the teacher's multi-arch `IrqManager`/`IrqController`
//! abstraction (APIC/GIC/PLIC delegation this single-architecture,
//! two-line kernel has no use for) with the flat vector switch this
//! kernel's fixed gate table actually needs.

use crate::arch::x86::idt::{TrapFrame, VEC_KEYBOARD, VEC_PAGE_FAULT, VEC_TIMER};
use crate::arch::x86::mmu;
use crate::arch::x86::pic;
use crate::arch::x86::timer;
use crate::drivers::keyboard;
use crate::mm::vmm;
use crate::process::exit;
use crate::sched;
use crate::syscall;

/// Called by [`crate::arch::x86::idt::dispatch_trap_trampoline`] with the
/// frame `trap_stub_common` just built on the current kernel stack.
pub fn dispatch_trap(frame: &mut TrapFrame) {
    let vector = frame.vector as u8;
    match vector {
        VEC_TIMER => handle_timer(),
        VEC_KEYBOARD => handle_keyboard(),
        VEC_PAGE_FAULT => handle_page_fault(frame),
        v if syscall::is_syscall_vector(v) => syscall::dispatch(frame),
        v => handle_exception(frame, v, 0),
    }
}

fn handle_timer() {
    let now = timer::tick();
    sched::sleep::wake_due(now);
    pic::send_eoi(VEC_TIMER);
    sched::timer_tick();
}

fn handle_keyboard() {
    keyboard::handle_scancode_interrupt();
    pic::send_eoi(VEC_KEYBOARD);
}

/// Page faults are attempted against the ZFOD table before being
/// surfaced as exceptions (spec §4.3 "Page-fault path", §4.9).
fn handle_page_fault(frame: &mut TrapFrame) {
    let fault_addr = mmu::read_cr2();
    let error = mmu::PageFaultErrorCode(frame.error_code);

    if let Some(tcb) = sched::current_tcb() {
        let dir_phys = *tcb.cr3.lock() as usize;
        if vmm::try_resolve_zfod_fault(dir_phys, fault_addr, error.write()).is_ok() {
            return;
        }
    }
    handle_exception(frame, VEC_PAGE_FAULT, fault_addr);
}

/// Generic unhandled-exception path: redirect into the thread's
/// registered swexn handler if it has one, otherwise record exit status
/// -2 and vanish only the faulting thread (spec §4.9, §7 "User-visible
/// behavior").
fn handle_exception(frame: &mut TrapFrame, vector: u8, cr2: u32) {
    if let Some(tcb) = sched::current_tcb() {
        if syscall::swexn::try_redirect(&tcb, frame, vector, cr2) {
            return;
        }
    }
    exit::set_status(-2);
    exit::vanish();
}
