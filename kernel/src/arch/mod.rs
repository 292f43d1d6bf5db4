//! Architecture support.
//!
//! This kernel targets exactly one architecture: 32-bit x86 protected
//! mode, uniprocessor. There is no per-arch dispatch left to do -- the
//! teacher crate this was adapted from supported x86_64/aarch64/riscv64
//! side by side, but a two-level (non-PAE) page table and a 32-bit
//! `ureg_t` trap frame only make sense on `x86`.

pub mod barriers;
pub mod x86;
