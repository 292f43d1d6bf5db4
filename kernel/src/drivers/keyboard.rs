//! PS/2 keyboard collaborator (spec §6): raw scancodes from IRQ1 into a
//! 2048-byte cyclic buffer, decoded to ASCII by `readchar`.
//!
//! Grounded on `original_source/kern/keyboard.c`: the IRQ handler only
//! enqueues the raw scancode byte (`keyboard_c_handler`); the state-machine
//! decode (make/break tracking, shift) that original farms out to the
//! course's `process_scancode` library call is reimplemented here as a
//! small scancode-set-1 table, since this kernel has no such collaborator
//! to call out to.

use spin::Mutex;

use crate::arch::x86::port::Port;

const KEYBOARD_DATA_PORT: u16 = 0x60;
const RING_CAPACITY: usize = 2048;

struct RingBuffer {
    buf: [u8; RING_CAPACITY],
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    const fn new() -> Self {
        Self {
            buf: [0; RING_CAPACITY],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.len == RING_CAPACITY {
            return; // drop on overflow, matches a bounded hardware queue
        }
        self.buf[self.head] = byte;
        self.head = (self.head + 1) % RING_CAPACITY;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.tail];
        self.tail = (self.tail + 1) % RING_CAPACITY;
        self.len -= 1;
        Some(byte)
    }
}

static SCANCODES: Mutex<RingBuffer> = Mutex::new(RingBuffer::new());
static SHIFT_HELD: Mutex<bool> = Mutex::new(false);

pub fn init() {
    *SCANCODES.lock() = RingBuffer::new();
}

/// Called from the IRQ1 handler. Must not block and must not take any
/// lock also taken by the console's print path.
pub fn handle_scancode_interrupt() {
    let mut port = Port::<u8>::new(KEYBOARD_DATA_PORT);
    // SAFETY: 0x60 is the standard PS/2 data port; reading it both
    // retrieves the scancode and is part of servicing IRQ1.
    let scancode = unsafe { port.read() };
    SCANCODES.lock().push(scancode);
}

const SET1_LOWER: [u8; 0x3A] = [
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

const SET1_UPPER: [u8; 0x3A] = [
    0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

const LSHIFT_MAKE: u8 = 0x2A;
const RSHIFT_MAKE: u8 = 0x36;
const LSHIFT_BREAK: u8 = 0xAA;
const RSHIFT_BREAK: u8 = 0xB6;
const BREAK_BIT: u8 = 0x80;

/// Decodes and returns the next completed keypress, or a negative value
/// when the buffer holds no decodable character yet.
pub fn readchar() -> i32 {
    loop {
        let scancode = match SCANCODES.lock().pop() {
            Some(b) => b,
            None => return -1,
        };

        match scancode {
            LSHIFT_MAKE | RSHIFT_MAKE => {
                *SHIFT_HELD.lock() = true;
                continue;
            }
            LSHIFT_BREAK | RSHIFT_BREAK => {
                *SHIFT_HELD.lock() = false;
                continue;
            }
            _ => {}
        }

        if scancode & BREAK_BIT != 0 {
            continue; // ignore key-release for everything else
        }

        let index = scancode as usize;
        let table = if *SHIFT_HELD.lock() {
            &SET1_UPPER
        } else {
            &SET1_LOWER
        };
        if index >= table.len() {
            continue;
        }
        let ch = table[index];
        if ch != 0 {
            return ch as i32;
        }
    }
}
