//! Sleep service (spec §4.5): an ordered wake list keyed on the tick
//! counter, drained by the timer interrupt.

use alloc::vec::Vec;

use spin::Mutex;

use crate::sched;

struct SleepEntry {
    wake_at: u64,
    tid: u32,
}

static SLEEPERS: Mutex<Vec<SleepEntry>> = Mutex::new(Vec::new());

/// Registers the calling thread to wake at or after `ticks` from now and
/// blocks it. The spec's ordering guarantee ("ticks-observed on return
/// >= n") holds because the timer tick only wakes entries whose
/// `wake_at` has already passed.
pub fn sleep(ticks: u64, now: u64) {
    if ticks == 0 {
        return;
    }
    SLEEPERS.lock().push(SleepEntry {
        wake_at: now + ticks,
        tid: sched::current_tid(),
    });
    sched::block_and_switch();
}

/// Called from the timer tick with the just-incremented tick count.
/// Wakes every sleeper whose deadline has passed.
pub fn wake_due(now: u64) {
    let mut sleepers = SLEEPERS.lock();
    let mut i = 0;
    while i < sleepers.len() {
        if sleepers[i].wake_at <= now {
            let entry = sleepers.swap_remove(i);
            let _ = sched::add_runnable(entry.tid);
        } else {
            i += 1;
        }
    }
}
