//! FIFO task queue, used for both the global ready queue and per-lock
//! wait queues.
//!
//! REDESIGN FLAGS: the original course kernel's queues are bounded by a
//! compile-time node-pool size; this repo drops that bound (§4.4's "no
//! fixed capacity" note) in favor of an allocator-backed `VecDeque`,
//! since a fixed ceiling on live thread count is an arbitrary limit this
//! kernel has no reason to impose.

use alloc::collections::VecDeque;

use spin::Mutex;

pub struct TaskQueue {
    inner: Mutex<VecDeque<u32>>,
}

impl TaskQueue {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_back(&self, tid: u32) {
        self.inner.lock().push_back(tid);
    }

    pub fn pop_front(&self) -> Option<u32> {
        self.inner.lock().pop_front()
    }

    pub fn remove(&self, tid: u32) -> bool {
        let mut queue = self.inner.lock();
        if let Some(pos) = queue.iter().position(|&t| t == tid) {
            queue.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
