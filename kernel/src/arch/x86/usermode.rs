//! Crafting the trap frames that take a thread into user mode for the
//! first time: boot's first task, a `fork` child, `exec`'s new image, and
//! the swexn trampoline (spec §4.7, §4.10).
//!
//! Replaces the teacher's `enter_usermode`/`enter_usermode_returnable`
//! pair (built around a long-mode `iretq` frame and a saved-boot-context
//! "return to kernel" trick) with the scheme this kernel actually uses:
//! every thread, including the first, is just another entry in the
//! scheduler's ready queue, so "entering user mode" is nothing more than
//! building the same [`TrapFrame`] + callee-saved-register prologue that
//! [`crate::arch::x86::context::switch_to`] expects to find on any
//! thread's kernel stack, with [`crate::arch::x86::idt::trap_return`] as
//! the return address in place of a real caller.

use core::mem::size_of;

use crate::arch::x86::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use crate::arch::x86::idt::{trap_return, TrapFrame};

/// `eflags` with interrupts enabled and the mandatory reserved bit 1 set.
const EFLAGS_IF: u32 = 0x202;

/// Builds the initial register file for a thread about to run user code
/// for the first time at `entry_eip` with a fresh `user_esp`, returning
/// `eax_value` (0 for a `fork`/`thread_fork` child, unused for the first
/// task or `exec`).
pub fn fresh_trap_frame(entry_eip: u32, user_esp: u32, eax_value: u32) -> TrapFrame {
    TrapFrame {
        gs: USER_DATA_SELECTOR as u32,
        fs: USER_DATA_SELECTOR as u32,
        es: USER_DATA_SELECTOR as u32,
        ds: USER_DATA_SELECTOR as u32,
        edi: 0,
        esi: 0,
        ebp: 0,
        esp_dummy: 0,
        ebx: 0,
        edx: 0,
        ecx: 0,
        eax: eax_value,
        vector: 0,
        error_code: 0,
        eip: entry_eip,
        cs: USER_CODE_SELECTOR as u32,
        eflags: EFLAGS_IF,
        esp3: user_esp,
        ss3: USER_DATA_SELECTOR as u32,
    }
}

/// Lays out a brand new kernel stack so that the scheduler's
/// [`crate::arch::x86::context::switch_to`] -- which always ends in a
/// bare `ret` after popping four callee-saved registers -- lands on
/// [`trap_return`] with `frame` sitting exactly where `trap_return`
/// expects to find it. Returns the resulting stack pointer to store as
/// the thread's saved esp.
///
/// # Safety
/// `kernel_stack_top` must be the top of a live, exclusively-owned
/// kernel stack at least `size_of::<TrapFrame>() + 20` bytes deep.
pub fn craft_initial_kernel_stack(kernel_stack_top: usize, frame: TrapFrame) -> usize {
    let mut sp = kernel_stack_top;

    sp -= size_of::<TrapFrame>();
    let frame_ptr = sp as *mut TrapFrame;
    // SAFETY: `sp` was just reserved within the caller-owned stack region
    // and is properly aligned for `TrapFrame` (stack top is page-aligned).
    unsafe { frame_ptr.write(frame) };

    sp -= size_of::<u32>();
    // SAFETY: same stack region; writes the return address `switch_to`'s
    // final `ret` will pop.
    unsafe { (sp as *mut u32).write(trap_return as usize as u32) };

    // Four callee-saved registers `switch_to` pops before the `ret`
    // (ebp, edi, esi, ebx); their initial values are never observed.
    sp -= 4 * size_of::<u32>();
    // SAFETY: zeroing 16 bytes within the caller-owned stack region.
    unsafe { core::ptr::write_bytes(sp as *mut u8, 0, 4 * size_of::<u32>()) };

    sp
}
