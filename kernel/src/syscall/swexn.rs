//! `swexn` (spec §4.10 "Software exception handling"): one-shot
//! user-mode exception handler registration, plus the trampoline that
//! redirects an unhandled exception into a registered handler instead
//! of vanishing the thread.
//!
//! Grounded on `original_source/kern/syscalls/swexn.c`: the handler is
//! consumed on first use (a handler that wants to stay installed across
//! faults re-registers from inside itself), and an optional `newureg`
//! argument lets the syscall double as "resume this thread with exactly
//! this register state", used by a handler returning from a fault it
//! fixed up itself.

use alloc::sync::Arc;
use core::mem::size_of;

use crate::arch::x86::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use crate::arch::x86::idt::TrapFrame;
use crate::error::KernelResult;
use crate::mm::user_validation;
use crate::sched::task::{SwexnHandler, Tcb};
use crate::syscall::read_arg;

/// Mirrors the user-visible `ureg_t`: the fault `cause` (the trap
/// vector) and `cr2` prepended to a full copy of the thread's register
/// file, laid out the way a handler taking `void handler(void *arg,
/// ureg_t *ureg)` expects to read it.
#[repr(C)]
#[derive(Clone, Copy)]
struct Ureg {
    cause: u32,
    cr2: u32,
    ds: u32,
    es: u32,
    fs: u32,
    gs: u32,
    edi: u32,
    esi: u32,
    ebp: u32,
    zero: u32,
    ebx: u32,
    edx: u32,
    ecx: u32,
    eax: u32,
    error_code: u32,
    eip: u32,
    cs: u32,
    eflags: u32,
    esp: u32,
    ss: u32,
}

impl Ureg {
    fn from_frame(frame: &TrapFrame, cause: u32, cr2: u32) -> Self {
        Self {
            cause,
            cr2,
            ds: frame.ds,
            es: frame.es,
            fs: frame.fs,
            gs: frame.gs,
            edi: frame.edi,
            esi: frame.esi,
            ebp: frame.ebp,
            zero: 0,
            ebx: frame.ebx,
            edx: frame.edx,
            ecx: frame.ecx,
            eax: frame.eax,
            error_code: frame.error_code,
            eip: frame.eip,
            cs: frame.cs,
            eflags: frame.eflags,
            esp: frame.esp3,
            ss: frame.ss3,
        }
    }
}

/// Required eflags bits: interrupts enabled, reserved bit 1 always set.
const EFLAGS_REQUIRED: u32 = 0x202;
/// Forbidden bits: IOPL (12-13), NT (14), VM (17) -- nothing a user
/// handler should be able to hand the kernel and have it believed.
const EFLAGS_FORBIDDEN: u32 = 0x3_3000;

fn selectors_valid(cs: u32, ds: u32, es: u32, fs: u32, gs: u32, ss: u32) -> bool {
    cs == USER_CODE_SELECTOR as u32
        && ds == USER_DATA_SELECTOR as u32
        && es == USER_DATA_SELECTOR as u32
        && fs == USER_DATA_SELECTOR as u32
        && gs == USER_DATA_SELECTOR as u32
        && ss == USER_DATA_SELECTOR as u32
}

fn eflags_valid(eflags: u32) -> bool {
    eflags & EFLAGS_REQUIRED == EFLAGS_REQUIRED && eflags & EFLAGS_FORBIDDEN == 0
}

/// Called from [`crate::irq::dispatch_trap`]'s unhandled-exception path.
/// Consumes the thread's registered handler (if any) and redirects
/// `frame` to resume in it. Returns `false` (leaving the handler
/// untouched would be wrong either way -- it is one-shot) when there
/// was no handler, or the handler's stack turned out to be unusable.
pub fn try_redirect(tcb: &Arc<Tcb>, frame: &mut TrapFrame, cause: u8, cr2: u32) -> bool {
    let Some(handler) = tcb.swexn.lock().take() else {
        return false;
    };

    let ureg = Ureg::from_frame(frame, cause as u32, cr2);
    let ureg_size = size_of::<Ureg>() as u32;

    let mut sp = handler.user_stack_top;
    sp = sp.saturating_sub(ureg_size);
    let ureg_addr = sp;
    if !user_validation::is_buffer_valid(ureg_addr, ureg_size as usize, false) {
        return false;
    }
    // SAFETY: `is_buffer_valid` confirmed `ureg_addr..ureg_addr+ureg_size`
    // is present and writable in the calling thread's own address space.
    unsafe { (ureg_addr as *mut Ureg).write(ureg) };

    // cdecl call args pushed in reverse: ureg_addr highest, arg next,
    // fake return address 0 lowest (where esp ends up).
    let mut push = |value: u32, sp: &mut u32| -> bool {
        *sp -= 4;
        if !user_validation::is_buffer_valid(*sp, 4, false) {
            return false;
        }
        // SAFETY: just validated.
        unsafe { (*sp as *mut u32).write(value) };
        true
    };
    if !push(ureg_addr, &mut sp) {
        return false;
    }
    if !push(handler.opaque_arg, &mut sp) {
        return false;
    }
    if !push(0, &mut sp) {
        return false;
    }

    frame.eip = handler.entry_eip;
    frame.esp3 = sp;
    frame.cs = USER_CODE_SELECTOR as u32;
    frame.ss3 = USER_DATA_SELECTOR as u32;
    frame.ds = USER_DATA_SELECTOR as u32;
    frame.es = USER_DATA_SELECTOR as u32;
    frame.fs = USER_DATA_SELECTOR as u32;
    frame.gs = USER_DATA_SELECTOR as u32;
    frame.eflags = EFLAGS_REQUIRED;
    true
}

/// `swexn(esp3, eip, arg, newureg)`. `esp3 == 0 || eip == 0` deregisters
/// any existing handler without installing a new one. A non-null
/// `newureg` additionally replaces the calling thread's register state
/// with the validated contents pointed to by it, taking effect the
/// instant this syscall returns.
pub fn swexn_syscall(frame: &mut TrapFrame, args: u32) -> KernelResult<u32> {
    let tcb = crate::sched::current_tcb().ok_or(crate::illegal_state!("swexn with no current thread"))?;

    let esp3 = read_arg(args, 0)?;
    let eip = read_arg(args, 1)?;
    let arg = read_arg(args, 2)?;
    let newureg_ptr = read_arg(args, 3)?;

    if esp3 == 0 || eip == 0 {
        *tcb.swexn.lock() = None;
    } else {
        if !user_validation::is_buffer_valid(eip, 1, true) {
            return Err(crate::invalid_arg!("swexn handler entry not executable user memory"));
        }
        *tcb.swexn.lock() = Some(SwexnHandler {
            user_stack_top: esp3,
            entry_eip: eip,
            opaque_arg: arg,
        });
    }

    if newureg_ptr == 0 {
        return Ok(0);
    }

    let ureg_size = size_of::<Ureg>();
    if !user_validation::is_buffer_valid(newureg_ptr, ureg_size, true) {
        return Err(crate::invalid_arg!("swexn newureg pointer invalid"));
    }
    // SAFETY: `is_buffer_valid` confirmed `ureg_size` readable bytes at
    // `newureg_ptr` in the calling thread's own address space.
    let ureg = unsafe { (newureg_ptr as *const Ureg).read_unaligned() };

    if !selectors_valid(ureg.cs, ureg.ds, ureg.es, ureg.fs, ureg.gs, ureg.ss) {
        return Err(crate::invalid_arg!("swexn newureg has invalid segment selectors"));
    }
    if !eflags_valid(ureg.eflags) {
        return Err(crate::invalid_arg!("swexn newureg has invalid eflags"));
    }

    frame.ds = ureg.ds;
    frame.es = ureg.es;
    frame.fs = ureg.fs;
    frame.gs = ureg.gs;
    frame.edi = ureg.edi;
    frame.esi = ureg.esi;
    frame.ebp = ureg.ebp;
    frame.ebx = ureg.ebx;
    frame.edx = ureg.edx;
    frame.ecx = ureg.ecx;
    frame.eax = ureg.eax;
    frame.eip = ureg.eip;
    frame.cs = ureg.cs;
    frame.eflags = ureg.eflags;
    frame.esp3 = ureg.esp;
    frame.ss3 = ureg.ss;

    Ok(frame.eax)
}
