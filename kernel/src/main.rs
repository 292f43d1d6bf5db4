//! Bootable kernel image. All real logic lives in the `pebble_kernel`
//! library crate; this binary exists only so Cargo produces an
//! executable with the real `_start`/panic/allocator items linked in
//! (the `[[test]]` integration binaries link `pebble_kernel` directly
//! instead, each with its own entry point).

#![no_std]
#![no_main]

extern crate pebble_kernel;
