//! Process/thread-lifecycle syscalls (spec §4.7, §6): `gettid`, `wait`,
//! `set_status`, `yield`, `deschedule`, `make_runnable`, `get_ticks`,
//! `sleep`, plus the `exec`/`vanish` entry points the dispatcher calls
//! directly since they never return an ordinary `eax` value.
//!
//! `fork` and `thread_fork` live in [`crate::process::fork`] and
//! [`crate::process::thread`] respectively and are called straight from
//! [`crate::syscall::dispatch`]; this module only wraps the lifecycle
//! operations that take the uniform "read args, call the collaborator,
//! write eax" shape.

use crate::arch::x86::idt::TrapFrame;
use crate::arch::x86::timer;
use crate::error::KernelResult;
use crate::mm::user_validation;
use crate::process::{exit, loader, wait};
use crate::raii::UserCStr;
use crate::sched;
use crate::syscall::{read_arg, write_out};

pub fn gettid_syscall() -> KernelResult<u32> {
    Ok(sched::current_tid())
}

/// `wait(int *status_ptr)`: blocks until a child exits, reaps it, writes
/// its exit status to `status_ptr` (if non-null), and returns its
/// original tid.
pub fn wait_syscall(args: u32) -> KernelResult<u32> {
    let status_ptr = read_arg(args, 0)?;
    let (original_tid, status) = wait::wait()?;
    write_out(status_ptr, status as u32)?;
    Ok(original_tid)
}

pub fn set_status_syscall(args: u32) -> KernelResult<u32> {
    let status = read_arg(args, 0)? as i32;
    exit::set_status(status);
    Ok(0)
}

/// `yield(int tid)`: `-1` yields to anything, otherwise directed at a
/// specific thread.
pub fn yield_syscall(args: u32) -> KernelResult<u32> {
    let tid = read_arg(args, 0)? as i32;
    sched::yield_to(tid);
    Ok(0)
}

/// `deschedule(int *reject)`: blocks the calling thread unless `*reject`
/// is non-zero at the moment of the call, matching the spec's "check
/// reject, then block" race-free contract -- the check and the block
/// happen with the same current-thread state the scheduler already
/// serializes on a uniprocessor.
pub fn deschedule_syscall(args: u32) -> KernelResult<u32> {
    let reject_ptr = read_arg(args, 0)?;
    if reject_ptr != 0 {
        if !user_validation::is_buffer_valid(reject_ptr, 4, true) {
            return Err(crate::invalid_arg!("deschedule reject pointer invalid"));
        }
        // SAFETY: just validated as present and readable in the calling
        // thread's own address space.
        let reject = unsafe { *(reject_ptr as *const i32) };
        if reject != 0 {
            return Ok(0);
        }
    }
    sched::block_and_switch();
    Ok(0)
}

pub fn make_runnable_syscall(args: u32) -> KernelResult<u32> {
    let tid = read_arg(args, 0)?;
    sched::add_runnable(tid)?;
    Ok(0)
}

pub fn get_ticks_syscall() -> KernelResult<u32> {
    Ok(timer::get_ticks() as u32)
}

pub fn sleep_syscall(args: u32) -> KernelResult<u32> {
    let ticks = read_arg(args, 0)? as u64;
    sched::sleep::sleep(ticks, timer::get_ticks());
    Ok(0)
}

/// `exec(char *execname, char *argv[])`: only `execname` is read; this
/// kernel's loader has no argv-copying stage (see DESIGN.md).
pub fn exec_syscall(frame: &mut TrapFrame, args: u32) -> KernelResult<()> {
    let execname_ptr = read_arg(args, 0)?;
    let execname = UserCStr::new(execname_ptr)?;
    loader::exec(frame, execname.as_str()?)
}

/// Called directly from the dispatcher: `vanish` never returns to set an
/// `eax`, it tears down the thread and switches away.
pub fn vanish_syscall() -> ! {
    exit::vanish()
}
