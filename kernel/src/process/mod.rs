//! Process/task lifecycle (spec §4.7): boot-time first-task creation,
//! `fork`, `thread_fork`, `exec`, `wait`, and `vanish`/`set_status`, plus
//! the PCB/task-table data model they share (spec §3).

pub mod creation;
pub mod exit;
pub mod fork;
pub mod loader;
pub mod pcb;
pub mod table;
pub mod thread;
pub mod wait;

pub fn init() {
    crate::println!("[PROCESS] task table online");
}
