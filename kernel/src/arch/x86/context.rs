//! Low-level thread context switch.
//!
//! Only the callee-saved registers and `esp` need to cross a switch: the
//! caller-saved ones are already spilled by the compiler around the call
//! to [`switch_to`], exactly like the teacher's context-switch primitive,
//! just with the 32-bit register set instead of the `x86_64` one.

use core::arch::naked_asm;

/// Saves the current thread's callee-saved registers and `esp` to
/// `*old_esp`, then restores the callee-saved registers and `esp` from
/// `new_esp` and returns into whatever called `switch_to` on that stack.
///
/// cdecl: `old_esp` at `[esp+4]`, `new_esp` at `[esp+8]`.
///
/// # Safety
/// `old_esp` must point at storage owned by the outgoing thread's TCB;
/// `new_esp` must be a value previously saved by a prior call to this
/// function for a thread that is not already running.
#[naked]
pub unsafe extern "C" fn switch_to(old_esp: *mut usize, new_esp: usize) {
    naked_asm!(
        "push ebx",
        "push esi",
        "push edi",
        "push ebp",
        "mov eax, [esp + 20]", // old_esp (4 pushes + return addr = 20)
        "mov [eax], esp",
        "mov edx, [esp + 24]", // new_esp
        "mov esp, edx",
        "pop ebp",
        "pop edi",
        "pop esi",
        "pop ebx",
        "ret",
    )
}
