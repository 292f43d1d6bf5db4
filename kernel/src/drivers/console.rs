//! VGA text-mode console collaborator (spec §6): `putbyte`, `draw_char`,
//! `get_char`, `scroll_up`, cursor show/hide/get/set, terminal color.
//!
//! Grounded on the teacher's `VgaConsole` (fixed 0xB8000 buffer, CRTC
//! cursor ports) and on `original_source/kern/drivers/console.c` for the
//! exact `putbyte` control-character semantics (`\n`, `\r`, `\b`).

use spin::Mutex;

use crate::arch::x86::vga::{self, ScreenChar, BUFFER_HEIGHT, BUFFER_WIDTH};

pub const CONSOLE_HEIGHT: usize = BUFFER_HEIGHT;
pub const CONSOLE_WIDTH: usize = BUFFER_WIDTH;

const DEFAULT_COLOR: u8 = 0x07; // black bg, light-gray fg

struct ConsoleState {
    row: usize,
    col: usize,
    color: u8,
    cursor_visible: bool,
}

impl ConsoleState {
    const fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            color: DEFAULT_COLOR,
            cursor_visible: true,
        }
    }

    fn sync_hw_cursor(&self) {
        if self.cursor_visible {
            vga::set_hw_cursor((self.row * CONSOLE_WIDTH + self.col) as u16);
        } else {
            // Sentinel "hidden" position, per spec.
            vga::set_hw_cursor((CONSOLE_HEIGHT * CONSOLE_WIDTH) as u16);
        }
    }

    fn scroll_up(&mut self) {
        for row in 1..CONSOLE_HEIGHT {
            for col in 0..CONSOLE_WIDTH {
                let ch = vga::read_char(row, col);
                vga::write_char(row - 1, col, ch);
            }
        }
        let blank = ScreenChar::new(b' ', self.color);
        for col in 0..CONSOLE_WIDTH {
            vga::write_char(CONSOLE_HEIGHT - 1, col, blank);
        }
    }

    fn advance(&mut self) {
        self.col += 1;
        if self.col >= CONSOLE_WIDTH {
            self.col = 0;
            self.newline();
        }
    }

    fn newline(&mut self) {
        if self.row + 1 >= CONSOLE_HEIGHT {
            self.scroll_up();
        } else {
            self.row += 1;
        }
    }

    fn putbyte(&mut self, ch: u8) {
        match ch {
            b'\n' => {
                self.col = 0;
                self.newline();
            }
            b'\r' => {
                self.col = 0;
            }
            0x08 => {
                if self.col > 0 {
                    self.col -= 1;
                    vga::write_char(self.row, self.col, ScreenChar::new(b' ', self.color));
                }
            }
            ch => {
                vga::write_char(self.row, self.col, ScreenChar::new(ch, self.color));
                self.advance();
            }
        }
        self.sync_hw_cursor();
    }
}

static CONSOLE: Mutex<ConsoleState> = Mutex::new(ConsoleState::new());

/// Writes one byte at the current cursor position, honoring `\n`/`\r`/`\b`.
/// Returns the byte written, matching the original `putbyte` contract.
pub fn putbyte(ch: u8) -> u8 {
    CONSOLE.lock().putbyte(ch);
    ch
}

pub fn puts(s: &str) {
    let mut state = CONSOLE.lock();
    for byte in s.bytes() {
        state.putbyte(byte);
    }
}

/// Draws `ch` at an arbitrary position without moving the cursor.
pub fn draw_char(row: usize, col: usize, ch: u8, color: u8) -> Result<(), crate::error::KernelError> {
    if row >= CONSOLE_HEIGHT || col >= CONSOLE_WIDTH {
        return Err(crate::invalid_arg!("console position out of bounds"));
    }
    vga::write_char(row, col, ScreenChar::new(ch, color));
    Ok(())
}

pub fn get_char(row: usize, col: usize) -> Result<u8, crate::error::KernelError> {
    if row >= CONSOLE_HEIGHT || col >= CONSOLE_WIDTH {
        return Err(crate::invalid_arg!("console position out of bounds"));
    }
    Ok(vga::read_char(row, col).ascii())
}

pub fn scroll_up() {
    CONSOLE.lock().scroll_up();
}

pub fn set_cursor(row: usize, col: usize) -> Result<(), crate::error::KernelError> {
    if row >= CONSOLE_HEIGHT || col > CONSOLE_WIDTH {
        return Err(crate::invalid_arg!("console position out of bounds"));
    }
    let mut state = CONSOLE.lock();
    state.row = row;
    state.col = col;
    state.sync_hw_cursor();
    Ok(())
}

pub fn get_cursor() -> (usize, usize) {
    let state = CONSOLE.lock();
    (state.row, state.col)
}

pub fn hide_cursor() {
    let mut state = CONSOLE.lock();
    state.cursor_visible = false;
    state.sync_hw_cursor();
}

pub fn show_cursor() {
    let mut state = CONSOLE.lock();
    state.cursor_visible = true;
    state.sync_hw_cursor();
}

pub fn set_terminal_color(color: u8) {
    CONSOLE.lock().color = color;
}

pub fn get_term_color() -> u8 {
    CONSOLE.lock().color
}

pub fn init() {
    let mut state = CONSOLE.lock();
    for row in 0..CONSOLE_HEIGHT {
        for col in 0..CONSOLE_WIDTH {
            vga::write_char(row, col, ScreenChar::new(b' ', state.color));
        }
    }
    state.row = 0;
    state.col = 0;
    state.sync_hw_cursor();
}

/// Backs the `print!`/`println!` macros on the bare-metal target.
pub fn _print(args: core::fmt::Arguments) {
    use core::fmt::Write;
    struct Writer;
    impl core::fmt::Write for Writer {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            puts(s);
            Ok(())
        }
    }
    let _ = Writer.write_fmt(args);
}
