//! Console and keyboard syscalls (spec §4.8, §6): `print`, `readline`,
//! `set_term_color`, `set_cursor_pos`, `get_cursor_pos`.
//!
//! The spec's readline describes a dedicated consumer thread
//! rendezvousing with the keyboard IRQ producer; this kernel instead has
//! the calling thread poll [`keyboard::readchar`] directly and yield
//! when the ring buffer is empty, serialized by [`READLINE_LOCK`] so
//! concurrent callers still get one coherent line each rather than
//! interleaved characters (see DESIGN.md "readline simplification").

use alloc::vec::Vec;

use crate::drivers::{console, keyboard};
use crate::error::KernelResult;
use crate::raii::UserBuffer;
use crate::sched;
use crate::sync::QueueMutex;
use crate::syscall::{read_arg, write_out};

static READLINE_LOCK: QueueMutex<()> = QueueMutex::new(());

/// `print(int len, char *buf)`.
pub fn print_syscall(args: u32) -> KernelResult<u32> {
    let len = read_arg(args, 0)? as usize;
    let buf = read_arg(args, 1)?;

    if len == 0 {
        return Ok(0);
    }
    let buf = UserBuffer::new(buf, len, true)?;
    for &byte in buf.as_slice() {
        console::putbyte(byte);
    }
    Ok(0)
}

const BACKSPACE: u8 = 0x08;

/// `readline(int len, char *buf)`: echoes characters as they are typed,
/// stops at `\n` (included in the returned bytes) or after `len` bytes,
/// whichever comes first.
pub fn readline_syscall(args: u32) -> KernelResult<u32> {
    let len = read_arg(args, 0)? as usize;
    let buf = read_arg(args, 1)?;

    if len == 0 {
        return Ok(0);
    }
    let out = UserBuffer::new(buf, len, false)?;

    let _guard = READLINE_LOCK.lock();
    let mut line: Vec<u8> = Vec::new();

    loop {
        match keyboard::readchar() {
            c if c < 0 => sched::yield_to(-1),
            c => {
                let ch = c as u8;
                if ch == BACKSPACE {
                    if line.pop().is_some() {
                        console::putbyte(BACKSPACE);
                    }
                    continue;
                }
                console::putbyte(ch);
                line.push(ch);
                if ch == b'\n' || line.len() >= len {
                    break;
                }
            }
        }
    }

    let to_copy = line.len().min(len);
    if to_copy > 0 {
        out.as_mut_slice()[..to_copy].copy_from_slice(&line[..to_copy]);
    }
    Ok(to_copy as u32)
}

pub fn set_term_color_syscall(args: u32) -> KernelResult<u32> {
    let color = read_arg(args, 0)? as u8;
    console::set_terminal_color(color);
    Ok(0)
}

pub fn set_cursor_pos_syscall(args: u32) -> KernelResult<u32> {
    let row = read_arg(args, 0)? as usize;
    let col = read_arg(args, 1)? as usize;
    console::set_cursor(row, col)?;
    Ok(0)
}

pub fn get_cursor_pos_syscall(args: u32) -> KernelResult<u32> {
    let row_ptr = read_arg(args, 0)?;
    let col_ptr = read_arg(args, 1)?;
    let (row, col) = console::get_cursor();
    write_out(row_ptr, row as u32)?;
    write_out(col_ptr, col as u32)?;
    Ok(0)
}
