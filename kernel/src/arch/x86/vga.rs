//! Raw VGA text-mode buffer and CRT-controller cursor access.
//!
//! This is the hardware edge the spec treats as an external collaborator
//! (§1, §6 "VGA text-mode console driver"); [`crate::drivers::console`] is
//! the actual collaborator surface the rest of the kernel calls through.

use volatile::Volatile;

pub const BUFFER_HEIGHT: usize = 25;
pub const BUFFER_WIDTH: usize = 80;

const VGA_BUFFER_ADDR: usize = 0xb_8000;
const CRTC_INDEX_PORT: u16 = 0x3D4;
const CRTC_DATA_PORT: u16 = 0x3D5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ScreenChar(u16);

impl ScreenChar {
    pub fn new(ascii: u8, color: u8) -> Self {
        Self((color as u16) << 8 | ascii as u16)
    }

    pub fn ascii(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn color(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

#[repr(transparent)]
struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

fn buffer() -> &'static mut Buffer {
    // SAFETY: 0xb8000 is the fixed physical address of the VGA text buffer,
    // identity-mapped into kernel space at boot. Every caller goes through
    // `drivers::console`'s mutex, so there is exactly one mutable borrow
    // live at a time.
    unsafe { &mut *(VGA_BUFFER_ADDR as *mut Buffer) }
}

pub fn write_char(row: usize, col: usize, ch: ScreenChar) {
    buffer().chars[row][col].write(ch);
}

pub fn read_char(row: usize, col: usize) -> ScreenChar {
    buffer().chars[row][col].read()
}

/// Set the hardware cursor position via the CRT controller's index/data
/// port pair (index 0x0E/0x0F for the high/low byte of the cursor offset).
pub fn set_hw_cursor(offset: u16) {
    let mut index = crate::arch::x86::port::Port::<u8>::new(CRTC_INDEX_PORT);
    let mut data = crate::arch::x86::port::Port::<u8>::new(CRTC_DATA_PORT);
    // SAFETY: 0x3D4/0x3D5 are the standard CRTC index/data ports; writing
    // register 0x0E/0x0F with the cursor offset is the documented sequence.
    unsafe {
        index.write(0x0E);
        data.write((offset >> 8) as u8);
        index.write(0x0F);
        data.write((offset & 0xFF) as u8);
    }
}
