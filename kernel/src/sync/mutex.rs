//! Sleep locks: a ticket mutex for boot-time/low-contention use and a
//! queue mutex for everything else (spec §4.6).
//!
//! Grounded on `original_source/kern/mutex.c`: a ticket-number mutex
//! (`next_ticket`/`now_serving`) that busy-waits by yielding directly to
//! the ticket holder's tid, and a general queue-based mutex that blocks
//! the calling thread via the scheduler rather than spinning. Both are
//! built on [`crate::sched`] rather than on raw spinning, since blocking
//! here means leaving the CPU for another runnable thread, not spinning.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

use crate::sched;
use crate::sched::queue::TaskQueue;

/// Ticket mutex: every acquirer draws a ticket and yields directly to
/// whichever tid currently holds the lock until its number is served.
/// Used only before the ready queue exists, or for very short critical
/// sections where allocating a wait-queue node would be overkill.
pub struct TicketMutex<T> {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
    holder: AtomicU32,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for TicketMutex<T> {}
unsafe impl<T: Send> Sync for TicketMutex<T> {}

impl<T> TicketMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            holder: AtomicU32::new(0),
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> TicketMutexGuard<'_, T> {
        let my_ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != my_ticket {
            let holder_tid = self.holder.load(Ordering::Relaxed);
            if holder_tid != 0 {
                sched::yield_to(holder_tid as i32);
            } else {
                sched::yield_to(-1);
            }
        }
        self.holder
            .store(sched::current_tid(), Ordering::Relaxed);
        TicketMutexGuard { lock: self }
    }

    fn unlock(&self) {
        self.holder.store(0, Ordering::Relaxed);
        self.now_serving.fetch_add(1, Ordering::Release);
    }
}

pub struct TicketMutexGuard<'a, T> {
    lock: &'a TicketMutex<T>,
}

impl<T> Deref for TicketMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding the ticket serializes access to `data`.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for TicketMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the ticket serializes access to `data`.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for TicketMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

/// Queue mutex: the general-purpose lock used by every subsystem past
/// boot. A blocked waiter is parked on an intrusive queue and taken off
/// the CPU entirely via `block_and_switch`, rather than spinning.
pub struct QueueMutex<T> {
    locked: AtomicU32,
    waiters: TaskQueue,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for QueueMutex<T> {}
unsafe impl<T: Send> Sync for QueueMutex<T> {}

impl<T> QueueMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicU32::new(0),
            waiters: TaskQueue::new(),
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> QueueMutexGuard<'_, T> {
        loop {
            if self
                .locked
                .compare_exchange(0, 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return QueueMutexGuard { lock: self };
            }
            sched::block_on(&self.waiters);
        }
    }

    fn unlock(&self) {
        self.locked.store(0, Ordering::Release);
        sched::wake_one(&self.waiters);
    }
}

pub struct QueueMutexGuard<'a, T> {
    lock: &'a QueueMutex<T>,
}

impl<T> Deref for QueueMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: `locked` being held by this guard serializes access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for QueueMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: `locked` being held by this guard serializes access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for QueueMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
