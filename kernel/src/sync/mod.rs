//! Synchronization primitives (spec §4.6): mutexes and condition
//! variables.

pub mod condvar;
pub mod mutex;

pub use condvar::Condvar;
pub use mutex::{QueueMutex, QueueMutexGuard, TicketMutex, TicketMutexGuard};
