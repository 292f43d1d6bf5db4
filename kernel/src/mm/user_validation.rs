//! Syscall argument validators (spec §4.9): `is_buffer_valid` and
//! `is_valid_string`, checked against the current address space before
//! any pointer argument is dereferenced.

use crate::mm::page_table;
use crate::sched;

/// Maximum string length accepted by any syscall taking a user string,
/// matching the spec's `InvalidArg` case "string too long".
pub const MAX_USER_STRING_LEN: usize = 4096;

/// User address space upper bound; everything below 16 MiB is kernel
/// space and never valid as a user argument (spec §3).
const USER_SPACE_FLOOR: u32 = 16 * 1024 * 1024;

fn current_dir_phys() -> Option<u32> {
    sched::current_tcb().map(|tcb| *tcb.cr3.lock())
}

/// Validates that every byte of `[base, base+len)` is mapped, present,
/// user-accessible, and (when `read_only` is false) writable, in the
/// calling thread's address space.
pub fn is_buffer_valid(base: u32, len: usize, read_only: bool) -> bool {
    if len == 0 || base < USER_SPACE_FLOOR {
        return false;
    }
    let Some(end) = base.checked_add(len as u32) else {
        return false;
    };
    let Some(dir_phys) = current_dir_phys() else {
        return false;
    };

    let first_page = base & !0xFFF;
    let mut vaddr = first_page;
    while vaddr < end {
        let Some(entry) = page_table::lookup(dir_phys as usize, vaddr) else {
            return false;
        };
        let flags = entry.flags();
        if !flags.contains(page_table::PageFlags::USER) {
            return false;
        }
        if !read_only && !flags.contains(page_table::PageFlags::WRITABLE) && !entry.is_zfod() {
            return false;
        }
        vaddr = vaddr.wrapping_add(page_table::PAGE_SIZE as u32);
    }
    true
}

/// Validates a NUL-terminated user string: every byte up to and
/// including the terminator must lie in readable, user-accessible
/// memory, and the string (excluding the terminator) must not exceed
/// [`MAX_USER_STRING_LEN`].
pub fn is_valid_string(base: u32) -> bool {
    if base < USER_SPACE_FLOOR {
        return false;
    }
    let Some(dir_phys) = current_dir_phys() else {
        return false;
    };

    let mut vaddr = base;
    for _ in 0..MAX_USER_STRING_LEN {
        let page = vaddr & !0xFFF;
        let Some(entry) = page_table::lookup(dir_phys as usize, page) else {
            return false;
        };
        if !entry.flags().contains(page_table::PageFlags::USER) {
            return false;
        }
        // SAFETY: the page containing `vaddr` was just confirmed present
        // and user-accessible under the thread's own address space,
        // which is the address space currently loaded in `cr3`.
        let byte = unsafe { *(vaddr as *const u8) };
        if byte == 0 {
            return true;
        }
        vaddr = vaddr.wrapping_add(1);
    }
    false
}
