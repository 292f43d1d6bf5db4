//! Scheduler core (spec §4.4): context switch, `run_next`,
//! `make_runnable`, `block_and_switch`, `force_next`, timer tick.
//!
//! Grounded on `original_source/kern/scheduler.c`'s state machine
//! (exactly one `RUNNING` thread, ready queue feeding `run_next`) with
//! the context-switch primitive itself in [`crate::arch::x86::context`].

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use spin::Mutex;

use crate::arch::x86::{context, gdt, mmu};
use crate::error::{KernelError, KernelResult};
use crate::sched::queue::TaskQueue;
use crate::sched::task::{Tcb, ThreadState};

static NEXT_TID: AtomicU32 = AtomicU32::new(1);
static KERNEL_READY: AtomicBool = AtomicBool::new(false);

static TCB_TABLE: Mutex<BTreeMap<u32, Arc<Tcb>>> = Mutex::new(BTreeMap::new());
static CURRENT_TID: AtomicU32 = AtomicU32::new(0);
static READY: TaskQueue = TaskQueue::new();

/// Kernel stacks and TCB entries awaiting the next context switch to be
/// freed, since a thread can never free its own stack (spec lifecycle
/// note in §3).
static GC_QUEUE: Mutex<Vec<Arc<Tcb>>> = Mutex::new(Vec::new());

pub fn mark_kernel_ready() {
    KERNEL_READY.store(true, Ordering::Release);
}

pub fn kernel_ready() -> bool {
    KERNEL_READY.load(Ordering::Acquire)
}

/// Allocates the next thread id, wrapping to 1 on overflow (spec §3).
pub fn next_tid() -> u32 {
    loop {
        let id = NEXT_TID.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
        NEXT_TID.store(1, Ordering::Relaxed);
    }
}

pub fn register_tcb(tcb: Arc<Tcb>) {
    TCB_TABLE.lock().insert(tcb.tid, tcb);
}

pub fn lookup_tcb(tid: u32) -> Option<Arc<Tcb>> {
    TCB_TABLE.lock().get(&tid).cloned()
}

pub fn current_tid() -> u32 {
    CURRENT_TID.load(Ordering::Relaxed)
}

pub fn current_tcb() -> Option<Arc<Tcb>> {
    lookup_tcb(current_tid())
}

/// Adds `tid` to the tail of the ready queue (spec's `make_runnable`).
pub fn add_runnable(tid: u32) -> KernelResult<()> {
    let tcb = lookup_tcb(tid).ok_or(KernelError::NotFound { what: "tid" })?;
    *tcb.state.lock() = ThreadState::Runnable;
    READY.push_back(tid);
    Ok(())
}

/// Switches away from the current thread into whichever thread is named
/// by `target`, or the next ready thread if `target` is `None`. The
/// caller is responsible for having already set the outgoing thread's
/// state (`Blocked`, `Zombie`, or left as `Runnable` and re-enqueued).
fn switch_into(target: Option<u32>) {
    let next_tid = target.or_else(|| READY.pop_front());
    let Some(next_tid) = next_tid else {
        // Nothing runnable: spin with interrupts enabled until the timer
        // tick or an IRQ makes something runnable again.
        return;
    };
    let Some(next) = lookup_tcb(next_tid) else {
        return;
    };

    let outgoing_tid = CURRENT_TID.swap(next_tid, Ordering::AcqRel);
    *next.state.lock() = ThreadState::Running;
    gdt::set_kernel_stack(next.kernel_stack_base as u32);
    mmu::write_cr3(*next.cr3.lock());

    let outgoing = lookup_tcb(outgoing_tid);
    let new_esp = *next.saved_esp.lock();

    if let Some(outgoing) = outgoing {
        let old_esp_ptr: *mut usize = {
            let mut guard = outgoing.saved_esp.lock();
            &mut *guard as *mut usize
        };
        // SAFETY: `old_esp_ptr` points at storage owned by `outgoing`'s
        // Tcb, which is kept alive by the `Arc` on this stack frame for
        // the duration of the switch; this CPU is the only writer since
        // `outgoing` is not runnable again until this call returns.
        unsafe { context::switch_to(old_esp_ptr, new_esp) };
    } else {
        // No prior thread context (first switch ever): jump straight in.
        let mut scratch: usize = 0;
        // SAFETY: scratch is discarded; there is nothing to resume into.
        unsafe { context::switch_to(&mut scratch as *mut usize, new_esp) };
    }

    run_garbage_collector();
}

/// Picks the next ready thread and switches to it, requeueing the
/// current thread as runnable.
pub fn run_next() {
    let current = current_tid();
    if current != 0 {
        READY.push_back(current);
    }
    switch_into(None);
}

/// Blocks the calling thread and switches away. The caller must have
/// already arranged for something to wake this thread via
/// `add_runnable`.
pub fn block_and_switch() {
    if let Some(tcb) = current_tcb() {
        *tcb.state.lock() = ThreadState::Blocked;
    }
    switch_into(None);
}

/// Atomically makes `tid` runnable and switches directly into it,
/// bypassing the ready queue (used by the ticket mutex's directed yield
/// and by `thread_fork`'s initial handoff).
pub fn force_next_thread(tid: u32) -> KernelResult<()> {
    let tcb = lookup_tcb(tid).ok_or(KernelError::NotFound { what: "tid" })?;
    if *tcb.state.lock() == ThreadState::Zombie {
        return Err(KernelError::IllegalState {
            reason: "target thread is a zombie",
        });
    }
    let current = current_tid();
    if current != 0 {
        READY.push_back(current);
    }
    switch_into(Some(tid));
    Ok(())
}

/// `yield` syscall semantics: `tid == -1` means "yield to anything";
/// otherwise directed at a specific tid.
pub fn yield_to(tid: i32) {
    if tid < 0 {
        run_next();
    } else {
        let _ = force_next_thread(tid as u32);
    }
}

pub fn block_on(queue: &TaskQueue) {
    queue.push_back(current_tid());
    block_and_switch();
}

pub fn enqueue_waiter(queue: &TaskQueue, tid: u32) {
    queue.push_back(tid);
}

pub fn wake_one(queue: &TaskQueue) {
    if let Some(tid) = queue.pop_front() {
        let _ = add_runnable(tid);
    }
}

pub fn wake_all(queue: &TaskQueue) {
    while let Some(tid) = queue.pop_front() {
        let _ = add_runnable(tid);
    }
}

/// Called from the timer interrupt handler after ticking the clock and
/// waking due sleepers.
pub fn timer_tick() {
    if !kernel_ready() || READY.is_empty() {
        return;
    }
    run_next();
}

/// Marks `tid`'s TCB as a zombie and schedules its kernel stack for
/// lazy collection by the next thread through here or through `wait`.
pub fn retire_thread(tid: u32) {
    if let Some(tcb) = lookup_tcb(tid) {
        *tcb.state.lock() = ThreadState::Zombie;
        GC_QUEUE.lock().push(tcb);
    }
}

fn run_garbage_collector() {
    let mut queue = GC_QUEUE.lock();
    let pending: Vec<Arc<Tcb>> = queue.drain(..).collect();
    drop(queue);
    for tcb in pending {
        TCB_TABLE.lock().remove(&tcb.tid);
        // The kernel stack page itself is released by the frame
        // allocator when the Arc's last reference drops here.
    }
}
