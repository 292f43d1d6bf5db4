//! 32-bit x86 protected-mode architecture support.
//!
//! Hardware bring-up (GDT, IDT, PIC), the trap/context-switch machinery,
//! and the port-I/O primitives the rest of the kernel builds on. The
//! teacher's `x86_64`-crate-backed equivalents only build in long mode;
//! everything here is a direct, 32-bit reimplementation (see DESIGN.md).

use core::arch::asm;

pub mod boot;
pub mod context;
pub mod entry;
pub mod gdt;
pub mod idt;
pub mod mmu;
pub mod pic;
pub mod port;
pub mod timer;
pub mod usermode;
pub mod vga;

/// Brings up the GDT, IDT, and PIC, in that order, with interrupts
/// disabled throughout. Paging is brought up separately by
/// [`crate::mm::init`], since it needs the multiboot memory map first.
///
/// # Safety
/// Must run exactly once, very early in boot.
pub unsafe fn init() {
    // SAFETY: interrupts must stay off until the IDT and PIC are fully
    // programmed below.
    unsafe { asm!("cli", options(nomem, nostack)) };

    // SAFETY: runs once, before any user-mode entry or concurrent access.
    unsafe { gdt::init() };
    // SAFETY: runs once, before interrupts are enabled.
    unsafe { idt::init() };
    // SAFETY: runs once, before interrupts are enabled.
    unsafe { pic::init() };
}

/// Enables hardware interrupts. Called once boot has registered the
/// first task and is ready to be preempted.
pub fn enable_interrupts() {
    // SAFETY: sti is always valid; the IDT and PIC are fully programmed
    // by the time any caller reaches this point.
    unsafe { asm!("sti", options(nomem, nostack)) };
}

pub fn disable_interrupts() {
    // SAFETY: cli is always valid.
    unsafe { asm!("cli", options(nomem, nostack)) };
}

/// Halts the CPU until the next interrupt. Used by the idle thread.
pub fn halt() {
    // SAFETY: hlt with interrupts enabled simply parks the CPU until the
    // next interrupt; no memory side effects.
    unsafe { asm!("hlt", options(nomem, nostack)) };
}
