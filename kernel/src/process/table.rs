//! Global task table: hash lookup by tid (spec §3 "Task/thread tables").

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::process::pcb::Pcb;

static NEXT_TASK_ID: AtomicU32 = AtomicU32::new(1);
static TASK_TABLE: Mutex<BTreeMap<u32, Arc<Pcb>>> = Mutex::new(BTreeMap::new());
static INIT_TASK: Mutex<Option<Arc<Pcb>>> = Mutex::new(None);

/// Allocates the next task id, wrapping to 1 on overflow (spec §3).
pub fn next_task_id() -> u32 {
    loop {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        if id != 0 {
            return id;
        }
        NEXT_TASK_ID.store(1, Ordering::Relaxed);
    }
}

pub fn register(pcb: Arc<Pcb>) {
    TASK_TABLE.lock().insert(pcb.task_id, pcb);
}

pub fn lookup(task_id: u32) -> Option<Arc<Pcb>> {
    TASK_TABLE.lock().get(&task_id).cloned()
}

pub fn remove(task_id: u32) {
    TASK_TABLE.lock().remove(&task_id);
}

/// Records the boot init task, the reparent target for orphaned
/// children (spec §3 "pointer to the boot init task").
pub fn set_init_task(pcb: Arc<Pcb>) {
    *INIT_TASK.lock() = Some(pcb);
}

pub fn init_task() -> Option<Arc<Pcb>> {
    INIT_TASK.lock().clone()
}
