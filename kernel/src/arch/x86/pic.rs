//! 8259 Programmable Interrupt Controller, remapped so IRQ0-15 land on
//! vectors 32-47 (clear of the CPU exception range).
//!
//! Grounded on the teacher's inline PIC bring-up (previously embedded in
//! `arch::x86::init`), pulled out to its own module since `irq::dispatch_trap`
//! also needs `send_eoi` on every timer/keyboard interrupt (spec §4.9).

use crate::arch::x86::port::Port;

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;
const PIC_EOI: u8 = 0x20;

/// Vector offset for the master PIC (IRQ0 = this kernel's `VEC_TIMER`).
pub const PIC1_OFFSET: u8 = 32;
/// Vector offset for the slave PIC (IRQ8..15).
pub const PIC2_OFFSET: u8 = 40;

/// Remaps both PICs to `PIC1_OFFSET`/`PIC2_OFFSET` and masks every line
/// except IRQ0 (timer) and IRQ1 (keyboard), the only two this kernel
/// services.
///
/// # Safety
/// Must run once, during early boot, with interrupts disabled.
pub unsafe fn init() {
    let mut pic1_cmd = Port::<u8>::new(PIC1_COMMAND);
    let mut pic1_data = Port::<u8>::new(PIC1_DATA);
    let mut pic2_cmd = Port::<u8>::new(PIC2_COMMAND);
    let mut pic2_data = Port::<u8>::new(PIC2_DATA);

    // SAFETY: standard 8259 ICW1-ICW4 remap sequence; ends with both
    // PICs masked except the two lines this kernel actually services.
    unsafe {
        pic1_cmd.write(ICW1_INIT);
        pic2_cmd.write(ICW1_INIT);

        pic1_data.write(PIC1_OFFSET);
        pic2_data.write(PIC2_OFFSET);

        pic1_data.write(4); // PIC2 lives on IRQ2 of PIC1
        pic2_data.write(2);

        pic1_data.write(ICW4_8086);
        pic2_data.write(ICW4_8086);

        // Mask everything except IRQ0 (timer) and IRQ1 (keyboard).
        pic1_data.write(0b1111_1100);
        pic2_data.write(0xFF);
    }
}

/// Sends end-of-interrupt for `vector`, which must be in the remapped
/// IRQ range (`PIC1_OFFSET..PIC1_OFFSET+16`). Slave-PIC vectors also EOI
/// the master, per the cascade wiring.
pub fn send_eoi(vector: u8) {
    let mut pic1_cmd = Port::<u8>::new(PIC1_COMMAND);
    let mut pic2_cmd = Port::<u8>::new(PIC2_COMMAND);
    if vector >= PIC2_OFFSET {
        // SAFETY: 0xA0 is the slave PIC's command port; EOI is always
        // safe to send after servicing one of its lines.
        unsafe { pic2_cmd.write(PIC_EOI) };
    }
    // SAFETY: 0x20 is the master PIC's command port.
    unsafe { pic1_cmd.write(PIC_EOI) };
}
