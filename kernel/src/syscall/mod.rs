//! Syscall numbers, gate installation, and argument dispatch (spec §4.9,
//! §6 "Syscall surface").
//!
//! Every syscall gets its own IDT vector, exactly like the teacher's
//! `x86_64` syscall path installs one gate per number instead of the
//! `syscall`/`sysenter` fast path -- the only difference here is that
//! this kernel has no fast-path instruction to prefer, since it targets
//! 32-bit protected mode. Arguments are passed as a flat array of 32-bit
//! words pointed to by `esp3` (the user stack pointer at the `int`
//! instruction); zero-argument calls ignore it.

#![allow(dead_code)]

use core::arch::naked_asm;

use crate::arch::x86::idt::TrapFrame;
use crate::error::KernelResult;
use crate::mm::user_validation;

pub mod console;
pub mod filesystem;
pub mod memory;
pub mod process;
pub mod swexn;

/// First vector handed out to syscalls, chosen to sit right after the
/// fixed IRQ range (32..=33 used by timer/keyboard).
pub const SYSCALL_VECTOR_BASE: u8 = 48;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallNumber {
    GetTid = 0,
    Fork = 1,
    ThreadFork = 2,
    Exec = 3,
    Wait = 4,
    Vanish = 5,
    SetStatus = 6,
    Yield = 7,
    Deschedule = 8,
    MakeRunnable = 9,
    GetTicks = 10,
    Sleep = 11,
    NewPages = 12,
    RemovePages = 13,
    Print = 14,
    Readline = 15,
    SetTermColor = 16,
    SetCursorPos = 17,
    GetCursorPos = 18,
    ReadFile = 19,
    Swexn = 20,
}

impl SyscallNumber {
    fn from_vector(vector: u8) -> Option<Self> {
        let index = vector.checked_sub(SYSCALL_VECTOR_BASE)?;
        Some(match index {
            0 => Self::GetTid,
            1 => Self::Fork,
            2 => Self::ThreadFork,
            3 => Self::Exec,
            4 => Self::Wait,
            5 => Self::Vanish,
            6 => Self::SetStatus,
            7 => Self::Yield,
            8 => Self::Deschedule,
            9 => Self::MakeRunnable,
            10 => Self::GetTicks,
            11 => Self::Sleep,
            12 => Self::NewPages,
            13 => Self::RemovePages,
            14 => Self::Print,
            15 => Self::Readline,
            16 => Self::SetTermColor,
            17 => Self::SetCursorPos,
            18 => Self::GetCursorPos,
            19 => Self::ReadFile,
            20 => Self::Swexn,
            _ => return None,
        })
    }
}

const SYSCALL_COUNT: u8 = 21;

pub fn is_syscall_vector(vector: u8) -> bool {
    vector >= SYSCALL_VECTOR_BASE && vector < SYSCALL_VECTOR_BASE + SYSCALL_COUNT
}

/// Reads the `idx`-th word of the argument block pointed to by `args_ptr`,
/// validating it lies in readable user memory first (spec §4.9 "any
/// pointer argument is checked ... before dereference").
fn read_arg(args_ptr: u32, idx: usize) -> KernelResult<u32> {
    let addr = args_ptr.wrapping_add((idx * 4) as u32);
    if !user_validation::is_buffer_valid(addr, 4, true) {
        return Err(crate::invalid_arg!("syscall argument pointer invalid"));
    }
    // SAFETY: `is_buffer_valid` just confirmed `addr..addr+4` is present
    // and user-readable in the calling thread's own address space.
    Ok(unsafe { *(addr as *const u32) })
}

/// Writes `value` to a user-space output pointer, validating it is
/// writable first. `addr == 0` is treated as "no output requested" and
/// silently skipped, matching e.g. `wait`'s optional `status_out`.
fn write_out(addr: u32, value: u32) -> KernelResult<()> {
    if addr == 0 {
        return Ok(());
    }
    if !user_validation::is_buffer_valid(addr, 4, false) {
        return Err(crate::invalid_arg!("syscall output pointer invalid"));
    }
    // SAFETY: `is_buffer_valid` just confirmed `addr..addr+4` is present,
    // user-accessible, and writable in the calling thread's own address
    // space.
    unsafe { *(addr as *mut u32) = value };
    Ok(())
}

/// Called from [`crate::irq::dispatch_trap`] for any vector in the
/// syscall range.
pub fn dispatch(frame: &mut TrapFrame) {
    let Some(number) = SyscallNumber::from_vector(frame.vector as u8) else {
        frame.eax = (crate::invalid_arg!("unknown syscall vector").to_syscall_errno()) as u32;
        return;
    };
    let args = frame.esp3;

    if number == SyscallNumber::Vanish {
        process::vanish_syscall();
    }
    if number == SyscallNumber::Exec {
        if let Err(e) = process::exec_syscall(frame, args) {
            frame.eax = e.to_syscall_errno() as u32;
        }
        return;
    }
    if number == SyscallNumber::Fork {
        match crate::process::fork::fork(frame) {
            Ok(tid) => frame.eax = tid,
            Err(e) => frame.eax = e.to_syscall_errno() as u32,
        }
        return;
    }
    if number == SyscallNumber::ThreadFork {
        match process::thread::thread_fork(frame) {
            Ok(tid) => frame.eax = tid,
            Err(e) => frame.eax = e.to_syscall_errno() as u32,
        }
        return;
    }
    if number == SyscallNumber::Swexn {
        match swexn::swexn_syscall(frame, args) {
            Ok(value) => frame.eax = value,
            Err(e) => frame.eax = e.to_syscall_errno() as u32,
        }
        return;
    }

    let result: KernelResult<u32> = match number {
        SyscallNumber::GetTid => process::gettid_syscall(),
        SyscallNumber::Wait => process::wait_syscall(args),
        SyscallNumber::SetStatus => process::set_status_syscall(args),
        SyscallNumber::Yield => process::yield_syscall(args),
        SyscallNumber::Deschedule => process::deschedule_syscall(args),
        SyscallNumber::MakeRunnable => process::make_runnable_syscall(args),
        SyscallNumber::GetTicks => process::get_ticks_syscall(),
        SyscallNumber::Sleep => process::sleep_syscall(args),
        SyscallNumber::NewPages => memory::new_pages_syscall(args),
        SyscallNumber::RemovePages => memory::remove_pages_syscall(args),
        SyscallNumber::Print => console::print_syscall(args),
        SyscallNumber::Readline => console::readline_syscall(args),
        SyscallNumber::SetTermColor => console::set_term_color_syscall(args),
        SyscallNumber::SetCursorPos => console::set_cursor_pos_syscall(args),
        SyscallNumber::GetCursorPos => console::get_cursor_pos_syscall(args),
        SyscallNumber::ReadFile => filesystem::readfile_syscall(args),
        SyscallNumber::Fork
        | SyscallNumber::ThreadFork
        | SyscallNumber::Exec
        | SyscallNumber::Vanish
        | SyscallNumber::Swexn => unreachable!("handled above"),
    };

    match result {
        Ok(value) => frame.eax = value,
        Err(e) => frame.eax = e.to_syscall_errno() as u32,
    }
}

macro_rules! syscall_stubs {
    ($( ($stub:ident, $num:expr) ),* $(,)?) => {
        $(
            #[naked]
            unsafe extern "C" fn $stub() {
                naked_asm!(
                    "push 0",
                    "push {vector}",
                    "jmp {common}",
                    vector = const (SYSCALL_VECTOR_BASE as u32 + $num as u32),
                    common = sym crate::arch::x86::idt::trap_stub_common,
                )
            }
        )*

        /// Installs one gate per syscall number via `installer`, which owns
        /// the actual IDT write (`crate::arch::x86::idt::init` supplies it so
        /// this module never needs to know the gate descriptor layout).
        pub fn install_gates(installer: fn(u8, unsafe extern "C" fn())) {
            $(
                installer(SYSCALL_VECTOR_BASE + $num as u8, $stub);
            )*
        }
    };
}

syscall_stubs! {
    (stub_gettid, SyscallNumber::GetTid),
    (stub_fork, SyscallNumber::Fork),
    (stub_thread_fork, SyscallNumber::ThreadFork),
    (stub_exec, SyscallNumber::Exec),
    (stub_wait, SyscallNumber::Wait),
    (stub_vanish, SyscallNumber::Vanish),
    (stub_set_status, SyscallNumber::SetStatus),
    (stub_yield, SyscallNumber::Yield),
    (stub_deschedule, SyscallNumber::Deschedule),
    (stub_make_runnable, SyscallNumber::MakeRunnable),
    (stub_get_ticks, SyscallNumber::GetTicks),
    (stub_sleep, SyscallNumber::Sleep),
    (stub_new_pages, SyscallNumber::NewPages),
    (stub_remove_pages, SyscallNumber::RemovePages),
    (stub_print, SyscallNumber::Print),
    (stub_readline, SyscallNumber::Readline),
    (stub_set_term_color, SyscallNumber::SetTermColor),
    (stub_set_cursor_pos, SyscallNumber::SetCursorPos),
    (stub_get_cursor_pos, SyscallNumber::GetCursorPos),
    (stub_readfile, SyscallNumber::ReadFile),
    (stub_swexn, SyscallNumber::Swexn),
}
