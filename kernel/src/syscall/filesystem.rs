//! `readfile` (spec §4.7, §6): copies a slice of a catalog executable's
//! bytes into a user buffer. This kernel has no filesystem of its own --
//! the catalog collaborator named in §6 is the only namespace `readfile`
//! ever resolves against.

use crate::catalog;
use crate::error::KernelResult;
use crate::raii::{UserBuffer, UserCStr};
use crate::syscall::read_arg;

/// `readfile(char *name, char *buf, int count, int offset)`.
pub fn readfile_syscall(args: u32) -> KernelResult<u32> {
    let name_ptr = read_arg(args, 0)?;
    let buf_ptr = read_arg(args, 1)?;
    let count = read_arg(args, 2)? as usize;
    let offset = read_arg(args, 3)? as usize;

    let name = UserCStr::new(name_ptr)?;
    let buf = if count == 0 {
        None
    } else {
        Some(UserBuffer::new(buf_ptr, count, false)?)
    };

    let (file_bytes, file_len) = catalog::lookup(name.as_str()?).ok_or(crate::error::KernelError::NotFound {
        what: "catalog executable",
    })?;
    if offset > file_len {
        return Err(crate::invalid_arg!("readfile offset beyond end of file"));
    }

    let available = file_len - offset;
    let to_copy = count.min(available);
    if to_copy > 0 {
        let buf = buf.expect("to_copy > 0 implies count > 0");
        buf.as_mut_slice()[..to_copy].copy_from_slice(&file_bytes[offset..offset + to_copy]);
    }
    Ok(to_copy as u32)
}
