//! Kernel error types.
//!
//! Every fallible kernel operation returns `KernelResult<T>`. Syscall
//! handlers convert the final `KernelError` to a negative `i32` at the
//! trap-frame boundary via [`KernelError::to_syscall_errno`]; internal
//! callers (fork, exec, the frame allocator) propagate the typed error
//! with `?`.

use core::fmt;

/// Main kernel error type. Each variant maps to one of the five error
/// kinds named in the spec: `InvalidArg`, `OutOfResource`, `NotFound`,
/// `IllegalState`, `FaultUnhandled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// Bad pointer, unaligned address, non-positive length, string over
    /// the length cap, or an address outside the expected region.
    InvalidArg { reason: &'static str },
    /// No free frame, no kernel heap, or a bounded queue is full.
    OutOfResource { requested: usize, available: usize },
    /// Unknown tid, unknown executable name, or unknown ZFOD base.
    NotFound { what: &'static str },
    /// Multi-threaded fork/exec, double destroy, or an operation
    /// attempted before the kernel is ready.
    IllegalState { reason: &'static str },
    /// Unhandled CPU exception on a thread with no swexn handler.
    FaultUnhandled { vector: u8 },
}

pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Map to the negative-`i32` syscall ABI. `FaultUnhandled` never
    /// reaches a syscall return path (it drives `vanish` directly) but
    /// is given a code for completeness and for the test harness.
    pub const fn to_syscall_errno(self) -> i32 {
        match self {
            KernelError::InvalidArg { .. } => -1,
            KernelError::OutOfResource { .. } => -2,
            KernelError::NotFound { .. } => -3,
            KernelError::IllegalState { .. } => -4,
            KernelError::FaultUnhandled { .. } => -2,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArg { reason } => write!(f, "invalid argument: {reason}"),
            Self::OutOfResource {
                requested,
                available,
            } => write!(
                f,
                "out of resource: requested {requested}, {available} available"
            ),
            Self::NotFound { what } => write!(f, "not found: {what}"),
            Self::IllegalState { reason } => write!(f, "illegal state: {reason}"),
            Self::FaultUnhandled { vector } => write!(f, "unhandled fault on vector {vector}"),
        }
    }
}

#[macro_export]
macro_rules! invalid_arg {
    ($reason:expr) => {
        $crate::error::KernelError::InvalidArg { reason: $reason }
    };
}

#[macro_export]
macro_rules! illegal_state {
    ($reason:expr) => {
        $crate::error::KernelError::IllegalState { reason: $reason }
    };
}
