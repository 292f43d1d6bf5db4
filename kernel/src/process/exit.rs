//! `vanish` and `set_status` (spec §4.7 "vanish"/"set_status"): task
//! termination, child reparenting to init, and address-space teardown.
//!
//! Grounded on `original_source/kern/syscalls/vanish.c`: the last thread
//! of a task to vanish reparents every live child to the boot init task,
//! marks the task a zombie so a blocked parent's `wait` can reap it, and
//! tears down the address space; any other thread of a multi-threaded
//! task just retires itself. Replaces the teacher's POSIX signal
//! machinery (`kill`, `SignalAction`, `force_terminate_process`) and its
//! duplicate `wait_process`/`wait_process_with_options` pair, none of
//! which this kernel's non-goal-scoped signal-free design needs.

use alloc::sync::Arc;

use crate::mm::page_table;
use crate::process::pcb::TaskState;
use crate::process::table;
use crate::sched;

/// Records the exit status a later `vanish` will report to `wait`.
pub fn set_status(status: i32) {
    if let Some(tcb) = sched::current_tcb() {
        tcb.task.guarded.lock().exit_status = status;
    }
}

/// Terminates the calling thread. If it is the last thread of its task,
/// the task becomes a zombie, its live children are reparented to init,
/// and its address space is torn down. Never returns.
pub fn vanish() -> ! {
    let tcb = sched::current_tcb().expect("vanish with no current thread");
    let task = tcb.task.clone();
    let tid = tcb.tid;

    let is_last_thread = {
        let mut guarded = task.guarded.lock();
        guarded.live_thread_count -= 1;
        guarded.live_thread_count == 0
    };

    if is_last_thread {
        let children = {
            let mut guarded = task.guarded.lock();
            guarded.state = TaskState::Zombie;
            core::mem::take(&mut guarded.live_children)
        };

        if let Some(init) = table::init_task() {
            if !Arc::ptr_eq(&task, &init) {
                for child in children {
                    *child.parent.lock() = Some(init.clone());
                    init.guarded.lock().live_children.push(child);
                }
            }
        }

        page_table::teardown_directory(task.page_directory() as usize, false);

        if let Some(parent) = task.parent.lock().clone() {
            sched::wake_one(&parent.waiters);
        }
    }

    sched::retire_thread(tid);
    sched::run_next();
    unreachable!("vanished thread was scheduled again");
}
