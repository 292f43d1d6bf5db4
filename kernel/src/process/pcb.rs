//! Process control block (spec §3 PCB).

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::mm::vmm::Reservation;
use crate::sched::queue::TaskQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Zombie,
}

/// Fields mutated together under `Pcb::guarded`, matching the spec's "a
/// mutex for its own child lists and counters".
pub struct PcbGuarded {
    pub state: TaskState,
    pub exit_status: i32,
    pub live_thread_count: u32,
    pub reserved_frames: usize,
    pub live_children: Vec<Arc<Pcb>>,
    pub reaped_children: Vec<Arc<Pcb>>,
    pub zfod_reservations: Vec<Reservation>,
    pub last_kernel_stack_base: usize,
}

pub struct Pcb {
    pub task_id: u32,
    pub parent: Mutex<Option<Arc<Pcb>>>,
    /// tid of the thread that created this task (first or forking
    /// thread); returned by `wait` as the "exited task's original
    /// thread id".
    pub original_tid: u32,
    /// Physical address of the task's page directory. An `AtomicU32`
    /// rather than a plain field because `exec` replaces it in place on
    /// the live task (spec §4.7 "exec").
    page_directory: AtomicU32,
    pub waiters: TaskQueue,
    pub guarded: Mutex<PcbGuarded>,
}

impl Pcb {
    pub fn new(
        task_id: u32,
        original_tid: u32,
        page_directory: u32,
        parent: Option<Arc<Pcb>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            task_id,
            parent: Mutex::new(parent),
            original_tid,
            page_directory: AtomicU32::new(page_directory),
            waiters: TaskQueue::new(),
            guarded: Mutex::new(PcbGuarded {
                state: TaskState::Running,
                exit_status: 0,
                live_thread_count: 1,
                reserved_frames: 0,
                live_children: Vec::new(),
                reaped_children: Vec::new(),
                zfod_reservations: Vec::new(),
                last_kernel_stack_base: 0,
            }),
        })
    }

    pub fn is_zombie(&self) -> bool {
        self.guarded.lock().state == TaskState::Zombie
    }

    pub fn page_directory(&self) -> u32 {
        self.page_directory.load(Ordering::Acquire)
    }

    /// Installs a new page directory, used only by `exec` replacing a
    /// live task's address space in place.
    pub fn set_page_directory(&self, dir_phys: u32) {
        self.page_directory.store(dir_phys, Ordering::Release);
    }
}
