//! PIT (8253/8254) timer, programmed for periodic IRQ0 interrupts, and
//! the monotonic tick counter the `get_ticks`/`sleep` syscalls read
//! (spec §4.5).

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::x86::port::Port;

static TICKS: AtomicU64 = AtomicU64::new(0);

const PIT_FREQUENCY: u32 = 1_193_182;
const PIT_COMMAND_PORT: u16 = 0x43;
const PIT_CHANNEL0_PORT: u16 = 0x40;

/// Returns the tick counter's current value, the spec's `get_ticks`.
pub fn get_ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Advances the tick counter by one, called from the timer IRQ handler
/// before waking due sleepers and invoking the scheduler tick.
pub fn tick() -> u64 {
    TICKS.fetch_add(1, Ordering::Relaxed) + 1
}

/// Programs PIT channel 0 for periodic interrupts at `hz`.
///
/// # Safety
/// Must run once, during early boot, before interrupts are enabled.
pub unsafe fn init(hz: u32) {
    let divisor = (PIT_FREQUENCY / hz) as u16;
    let mut cmd = Port::<u8>::new(PIT_COMMAND_PORT);
    let mut data = Port::<u8>::new(PIT_CHANNEL0_PORT);
    // SAFETY: 0x43/0x40 are the standard PIT command/channel-0 ports;
    // mode 3 (square wave) with a 16-bit lobyte/hibyte divisor is the
    // documented configuration sequence.
    unsafe {
        cmd.write(0x36);
        data.write((divisor & 0xFF) as u8);
        data.write((divisor >> 8) as u8);
    }
}
