//! Validated user-memory wrappers (spec §9 "represent this as a typed
//! smart-pointer-like wrapper that checks on construction"): `UserPtr`
//! and `UserBuffer` check a user-supplied address against the calling
//! thread's page table exactly once, at construction, so a syscall body
//! reads or writes through them without re-validating on every access.
//!
//! Grounded on [`crate::mm::user_validation`], which does the actual
//! page-table walk; this module just turns "validate, then trust" into
//! a type instead of a convention every syscall has to repeat by hand.

use core::marker::PhantomData;

use crate::error::KernelResult;
use crate::mm::user_validation;

/// A validated pointer to a single `T` in the calling thread's user
/// address space. Construction fails if the pointee is not entirely
/// mapped, present, user-accessible, and (for [`UserPtr::new_mut`])
/// writable.
pub struct UserPtr<T> {
    addr: u32,
    _marker: PhantomData<T>,
}

impl<T: Copy> UserPtr<T> {
    pub fn new(addr: u32) -> KernelResult<Self> {
        if !user_validation::is_buffer_valid(addr, core::mem::size_of::<T>(), true) {
            return Err(crate::invalid_arg!("user pointer not valid for read"));
        }
        Ok(Self {
            addr,
            _marker: PhantomData,
        })
    }

    pub fn new_mut(addr: u32) -> KernelResult<Self> {
        if !user_validation::is_buffer_valid(addr, core::mem::size_of::<T>(), false) {
            return Err(crate::invalid_arg!("user pointer not valid for write"));
        }
        Ok(Self {
            addr,
            _marker: PhantomData,
        })
    }

    /// Reads the pointee. Safe because construction already confirmed
    /// the address is mapped, present, and user-readable in the calling
    /// thread's own address space, which cannot change underneath a
    /// single syscall on this uniprocessor kernel.
    pub fn read(&self) -> T {
        // SAFETY: see doc comment above.
        unsafe { *(self.addr as *const T) }
    }

    /// Writes the pointee. Only meaningful if constructed via
    /// [`UserPtr::new_mut`]; writing through a read-only-validated
    /// pointer would fault, which is exactly the outcome a caller who
    /// ignored that distinction deserves.
    pub fn write(&self, value: T) {
        // SAFETY: see doc comment above; write validity was confirmed by
        // `new_mut` at construction.
        unsafe { *(self.addr as *mut T) = value };
    }
}

/// A validated `[u8]` slice in the calling thread's user address space.
pub struct UserBuffer {
    addr: u32,
    len: usize,
}

impl UserBuffer {
    pub fn new(addr: u32, len: usize, read_only: bool) -> KernelResult<Self> {
        if !user_validation::is_buffer_valid(addr, len, read_only) {
            return Err(crate::invalid_arg!("user buffer not valid"));
        }
        Ok(Self { addr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrows the buffer for reading. Safe because construction already
    /// confirmed `[addr, addr+len)` is mapped, present, and
    /// user-readable.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: see doc comment above.
        unsafe { core::slice::from_raw_parts(self.addr as *const u8, self.len) }
    }

    /// Borrows the buffer for writing. Only meaningful if constructed
    /// with `read_only = false`.
    pub fn as_mut_slice(&self) -> &mut [u8] {
        // SAFETY: see doc comment above; write validity is the caller's
        // responsibility via the `read_only` flag passed to `new`.
        unsafe { core::slice::from_raw_parts_mut(self.addr as *mut u8, self.len) }
    }
}

/// A validated, NUL-terminated user string, borrowed as `&str` once its
/// bytes have been confirmed valid UTF-8.
pub struct UserCStr<'a> {
    bytes: &'a [u8],
}

impl<'a> UserCStr<'a> {
    pub fn new(addr: u32) -> KernelResult<Self> {
        if !user_validation::is_valid_string(addr) {
            return Err(crate::invalid_arg!("user string not valid"));
        }
        let mut len = 0usize;
        loop {
            // SAFETY: `is_valid_string` walked exactly this range and
            // found a terminator within `MAX_USER_STRING_LEN` bytes.
            let byte = unsafe { *((addr as usize + len) as *const u8) };
            if byte == 0 {
                break;
            }
            len += 1;
        }
        // SAFETY: `[addr, addr+len)` was just confirmed readable above,
        // and its lifetime is bounded by the calling thread's own
        // address space staying loaded for the duration of the syscall.
        let bytes = unsafe { core::slice::from_raw_parts(addr as *const u8, len) };
        Ok(Self { bytes })
    }

    pub fn as_str(&self) -> KernelResult<&'a str> {
        core::str::from_utf8(self.bytes).map_err(|_| crate::invalid_arg!("user string is not valid UTF-8"))
    }
}
