//! COM1 (16550 UART) serial output.
//!
//! Backs the kernel diagnostic log (`log` crate façade, see
//! [`crate::logging`]) and the `serial_print!`/`serial_println!` macros used
//! by the integration test harness to report results out of the emulator.
//! Out-of-scope PIC/PIT/VGA-grade driver polish is intentionally not here;
//! this is the one piece of "hardware programming detail" the spec does
//! not hand us an external collaborator for.

use core::fmt;

use spin::Mutex;

use crate::arch::x86::port::Port;

const COM1_BASE: u16 = 0x3F8;

pub struct SerialPort {
    data: Port<u8>,
    int_enable: Port<u8>,
    fifo_ctrl: Port<u8>,
    line_ctrl: Port<u8>,
    modem_ctrl: Port<u8>,
    line_status: Port<u8>,
}

impl SerialPort {
    const fn new(base: u16) -> Self {
        Self {
            data: Port::new(base),
            int_enable: Port::new(base + 1),
            fifo_ctrl: Port::new(base + 2),
            line_ctrl: Port::new(base + 3),
            modem_ctrl: Port::new(base + 4),
            line_status: Port::new(base + 5),
        }
    }

    /// # Safety
    /// Must only be called once, before any other code touches COM1.
    unsafe fn init(&mut self) {
        unsafe {
            self.int_enable.write(0x00); // disable all interrupts
            self.line_ctrl.write(0x80); // enable DLAB
            self.data.write(0x03); // divisor low byte: 38400 baud
            self.int_enable.write(0x00); // divisor high byte
            self.line_ctrl.write(0x03); // 8 bits, no parity, one stop bit
            self.fifo_ctrl.write(0xC7); // enable FIFO, clear, 14-byte threshold
            self.modem_ctrl.write(0x0B); // IRQs disabled, RTS/DSR set
        }
    }

    fn transmit_empty(&mut self) -> bool {
        unsafe { self.line_status.read() & 0x20 != 0 }
    }

    fn write_byte(&mut self, byte: u8) {
        while !self.transmit_empty() {
            core::hint::spin_loop();
        }
        unsafe { self.data.write(byte) };
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                b'\n' => {
                    self.write_byte(b'\r');
                    self.write_byte(b'\n');
                }
                b => self.write_byte(b),
            }
        }
        Ok(())
    }
}

static SERIAL1: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1_BASE));

/// Must be called exactly once during early boot, before interrupts are on.
pub fn init() {
    // SAFETY: called once from `bootstrap::early_init` before any
    // concurrent access to COM1 is possible.
    unsafe { SERIAL1.lock().init() };
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    SERIAL1.lock().write_fmt(args).ok();
}
