//! Thread control block (spec §3 TCB).

use alloc::sync::Arc;

use spin::Mutex;

use crate::process::pcb::Pcb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Runnable,
    Running,
    Blocked,
    Zombie,
}

/// One-shot software-exception handler registration (spec §4.10). All
/// three fields are set or cleared together; `None` means "no handler".
#[derive(Debug, Clone, Copy)]
pub struct SwexnHandler {
    pub user_stack_top: u32,
    pub entry_eip: u32,
    pub opaque_arg: u32,
}

pub struct Tcb {
    pub tid: u32,
    pub task: Arc<Pcb>,
    pub state: Mutex<ThreadState>,
    /// Base virtual address of this thread's single-page kernel stack.
    pub kernel_stack_base: usize,
    pub saved_esp: Mutex<usize>,
    pub cr3: Mutex<u32>,
    pub swexn: Mutex<Option<SwexnHandler>>,
    /// Set by `wait` bookkeeping: the task this thread most recently
    /// reaped, so a repeated `wait` call can find it.
    pub reaped_task: Mutex<Option<Arc<Pcb>>>,
}

impl Tcb {
    pub fn new(tid: u32, task: Arc<Pcb>, kernel_stack_base: usize, cr3: u32) -> Self {
        Self {
            tid,
            task,
            state: Mutex::new(ThreadState::Runnable),
            kernel_stack_base,
            saved_esp: Mutex::new(kernel_stack_base),
            cr3: Mutex::new(cr3),
            swexn: Mutex::new(None),
            reaped_task: Mutex::new(None),
        }
    }
}

impl Drop for Tcb {
    fn drop(&mut self) {
        crate::process::creation::free_kernel_stack(self.kernel_stack_base);
    }
}
