//! Ready queue, scheduler core, and sleep service (spec §4.4, §4.5).

pub mod queue;
pub mod scheduler;
pub mod sleep;
pub mod task;

pub use scheduler::{
    add_runnable, block_and_switch, block_on, current_tcb, current_tid, enqueue_waiter,
    force_next_thread, kernel_ready, lookup_tcb, mark_kernel_ready, next_tid, register_tcb,
    retire_thread, run_next, timer_tick, wake_all, wake_one, yield_to,
};

pub fn init() {
    crate::println!("[SCHED] ready queue and scheduler core online");
}
