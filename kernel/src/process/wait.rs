//! `wait` (spec §4.7 "wait"): blocks until a child task has exited,
//! reaps it, and returns its original thread id and exit status.
//!
//! Grounded on `original_source/kern/syscalls/wait.c`'s "collect any
//! already-dead child, otherwise block until one dies" loop. Replaces
//! the teacher's POSIX `waitpid` (pid filters, `WaitOptions`,
//! `WaitStatus` encodings this kernel has no signals to produce) with
//! the plain "any child" wait the spec calls for, built on `Pcb`'s own
//! `live_children`/`reaped_children` bookkeeping and `waiters` queue
//! instead of a separate global wait-queue map.

use crate::error::{KernelError, KernelResult};
use crate::process::table;
use crate::sched;

/// Blocks the calling thread until one of its task's children exits,
/// then reaps it. Returns `(original_tid, exit_status)` of the reaped
/// child, per spec §3's "wait returns the exited task's original thread
/// id".
pub fn wait() -> KernelResult<(u32, i32)> {
    let tcb = sched::current_tcb().ok_or(crate::illegal_state!("wait with no current thread"))?;
    let task = tcb.task.clone();

    loop {
        {
            let mut guarded = task.guarded.lock();
            if let Some(pos) = guarded.live_children.iter().position(|c| c.is_zombie()) {
                let child = guarded.live_children.remove(pos);
                let exit_status = child.guarded.lock().exit_status;
                let original_tid = child.original_tid;
                guarded.reaped_children.push(child.clone());
                drop(guarded);
                table::remove(child.task_id);
                return Ok((original_tid, exit_status));
            }
            if guarded.live_children.is_empty() {
                return Err(KernelError::NotFound {
                    what: "child task",
                });
            }
        }
        sched::block_on(&task.waiters);
    }
}
