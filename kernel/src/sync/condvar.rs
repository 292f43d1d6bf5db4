//! Condition variables, paired with a [`QueueMutex`](super::mutex::QueueMutex).
//!
//! `wait` atomically releases the mutex and blocks the calling thread;
//! `signal`/`broadcast` move waiters back onto the ready queue. A thread
//! returning from `wait` always re-acquires the mutex before the call
//! returns, per the spec's ordering guarantee.

use crate::sched;
use crate::sched::queue::TaskQueue;
use crate::sync::mutex::QueueMutex;

pub struct Condvar {
    waiters: TaskQueue,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            waiters: TaskQueue::new(),
        }
    }

    /// Releases `mutex`, blocks until woken, then re-acquires `mutex`
    /// before returning.
    pub fn wait<'a, T>(
        &self,
        mutex: &'a QueueMutex<T>,
        guard: crate::sync::mutex::QueueMutexGuard<'a, T>,
    ) -> crate::sync::mutex::QueueMutexGuard<'a, T> {
        sched::enqueue_waiter(&self.waiters, sched::current_tid());
        drop(guard);
        sched::block_and_switch();
        mutex.lock()
    }

    pub fn signal(&self) {
        sched::wake_one(&self.waiters);
    }

    pub fn broadcast(&self) {
        sched::wake_all(&self.waiters);
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
