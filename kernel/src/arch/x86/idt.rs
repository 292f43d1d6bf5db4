//! 32-bit Interrupt Descriptor Table and the uniform trap entry stubs.
//!
//! Every CPU exception, the timer IRQ, the keyboard IRQ, and each syscall
//! number gets its own gate (spec §4.9), all pointing at tiny assembly
//! trampolines that push a uniform [`TrapFrame`] and call
//! [`crate::irq::dispatch_trap`]. This replaces the teacher's
//! `x86_64::structures::idt::InterruptDescriptorTable`, which only builds
//! for the `x86_64` target and uses 16-byte long-mode gate descriptors;
//! the IA-32 gate descriptor this kernel needs is 8 bytes (see DESIGN.md).

use core::arch::{asm, naked_asm};
use core::mem::size_of;

use spin::Mutex;

use crate::syscall::SYSCALL_VECTOR_BASE;

const IDT_ENTRIES: usize = 256;

pub const VEC_DIVIDE_ERROR: u8 = 0;
pub const VEC_DEBUG: u8 = 1;
pub const VEC_BREAKPOINT: u8 = 3;
pub const VEC_INVALID_OPCODE: u8 = 6;
pub const VEC_GENERAL_PROTECTION: u8 = 13;
pub const VEC_PAGE_FAULT: u8 = 14;
pub const VEC_TIMER: u8 = 32;
pub const VEC_KEYBOARD: u8 = 33;

/// The register frame every trap stub builds on the current kernel stack
/// before calling into Rust. Field order matches the push sequence in
/// [`trap_stub_common`] (last pushed = first field) so the struct can be
/// read straight off `esp`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TrapFrame {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    // CPU-pushed, present unconditionally because ring 3 -> ring 0 always
    // changes stacks on this kernel (every thread runs user code at CPL 3).
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub esp3: u32,
    pub ss3: u32,
}

#[derive(Clone, Copy, Default)]
#[repr(C, packed)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    fn new(handler: u32, selector: u16, type_attr: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            type_attr,
            offset_high: ((handler >> 16) & 0xFFFF) as u16,
        }
    }
}

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u32,
}

static IDT: Mutex<[IdtEntry; IDT_ENTRIES]> = Mutex::new([IdtEntry {
    offset_low: 0,
    selector: 0,
    zero: 0,
    type_attr: 0,
    offset_high: 0,
}; IDT_ENTRIES]);

/// Interrupt gate, ring 0 only reachable via hardware interrupt (DPL 0).
const GATE_KERNEL: u8 = 0x8E;
/// Interrupt gate reachable with `int` from ring 3 (DPL 3) -- used for the
/// syscall vectors.
const GATE_USER: u8 = 0xEE;

macro_rules! define_stub {
    ($name:ident, $vector:expr, $has_error_code:expr) => {
        #[naked]
        unsafe extern "C" fn $name() {
            naked_asm!(
                ".if {has_err} == 0",
                "push 0",
                ".endif",
                "push {vector}",
                "jmp {common}",
                has_err = const $has_error_code as u32,
                vector = const $vector,
                common = sym trap_stub_common,
            )
        }
    };
}

define_stub!(stub_divide_error, VEC_DIVIDE_ERROR, 0);
define_stub!(stub_debug, VEC_DEBUG, 0);
define_stub!(stub_breakpoint, VEC_BREAKPOINT, 0);
define_stub!(stub_invalid_opcode, VEC_INVALID_OPCODE, 0);
define_stub!(stub_general_protection, VEC_GENERAL_PROTECTION, 1);
define_stub!(stub_page_fault, VEC_PAGE_FAULT, 1);
define_stub!(stub_timer, VEC_TIMER, 0);
define_stub!(stub_keyboard, VEC_KEYBOARD, 0);

/// The common second half of every stub: save the rest of the register
/// file, call the Rust dispatcher with a pointer to the frame, then
/// restore and `iret`. This is the "uniform save/restore" path spec §4.9
/// requires for every kernel-entry source (syscall, exception, IRQ).
/// Must be `pub(crate)`: [`crate::syscall::install_gates`] generates one
/// stub per syscall number and jumps here directly, exactly like the
/// fixed stubs above.
#[naked]
pub(crate) unsafe extern "C" fn trap_stub_common() {
    naked_asm!(
        "push eax",
        "push ecx",
        "push edx",
        "push ebx",
        "push esp", // esp_dummy -- popad semantics, value unused on restore
        "push ebp",
        "push esi",
        "push edi",
        "push ds",
        "push es",
        "push fs",
        "push gs",
        "mov ax, {kdata:x}",
        "mov ds, ax",
        "mov es, ax",
        "mov fs, ax",
        "mov gs, ax",
        "push esp",
        "call {dispatch}",
        "add esp, 4",
        "jmp {trap_return}",
        kdata = const crate::arch::x86::gdt::KERNEL_DATA_SELECTOR as u32,
        dispatch = sym dispatch_trap_trampoline,
        trap_return = sym trap_return,
    )
}

/// The restore half of a trap, factored out so a freshly crafted kernel
/// stack (first entry into a new thread, `fork` child, `exec`, swexn
/// redirection) can jump straight here instead of duplicating the pop
/// sequence.
#[naked]
pub unsafe extern "C" fn trap_return() -> ! {
    naked_asm!(
        "pop gs",
        "pop fs",
        "pop es",
        "pop ds",
        "pop edi",
        "pop esi",
        "pop ebp",
        "add esp, 4", // discard esp_dummy
        "pop ebx",
        "pop edx",
        "pop ecx",
        "pop eax",
        "add esp, 8", // discard vector, error_code
        "iretd",
    )
}

extern "C" fn dispatch_trap_trampoline(frame: *mut TrapFrame) {
    // SAFETY: `frame` was built by `trap_stub_common` immediately above on
    // the thread's own kernel stack; it stays valid for the duration of
    // this call.
    let frame = unsafe { &mut *frame };
    crate::irq::dispatch_trap(frame);
}

fn install(vector: u8, handler: unsafe extern "C" fn(), gate: u8) {
    let mut idt = IDT.lock();
    idt[vector as usize] = IdtEntry::new(
        handler as usize as u32,
        crate::arch::x86::gdt::KERNEL_CODE_SELECTOR,
        gate,
    );
}

/// Installs every fixed gate plus one gate per syscall number (spec
/// §4.9). Syscall stubs are generated in [`crate::syscall::install_gates`]
/// because that module owns the syscall-number -> vector mapping.
///
/// # Safety
/// Must run once, during early boot, with interrupts disabled.
pub unsafe fn init() {
    install(VEC_DIVIDE_ERROR, stub_divide_error, GATE_KERNEL);
    install(VEC_DEBUG, stub_debug, GATE_KERNEL);
    install(VEC_BREAKPOINT, stub_breakpoint, GATE_USER);
    install(VEC_INVALID_OPCODE, stub_invalid_opcode, GATE_KERNEL);
    install(VEC_GENERAL_PROTECTION, stub_general_protection, GATE_KERNEL);
    install(VEC_PAGE_FAULT, stub_page_fault, GATE_KERNEL);
    install(VEC_TIMER, stub_timer, GATE_KERNEL);
    install(VEC_KEYBOARD, stub_keyboard, GATE_KERNEL);
    crate::syscall::install_gates(install_syscall_gate);

    let pointer = IdtPointer {
        limit: (size_of::<[IdtEntry; IDT_ENTRIES]>() - 1) as u16,
        base: IDT.lock().as_ptr() as u32,
    };
    // SAFETY: standard `lidt` bring-up; the table outlives the kernel.
    unsafe {
        asm!("lidt [{0}]", in(reg) &pointer, options(readonly, nostack, preserves_flags));
    }
}

fn install_syscall_gate(vector: u8, handler: unsafe extern "C" fn()) {
    install(vector, handler, GATE_USER);
}

/// First vector available for syscalls, chosen to sit right after the
/// fixed IRQ range (32..=33 used by timer/keyboard).
pub const SYSCALL_VECTOR_START: u8 = SYSCALL_VECTOR_BASE;
