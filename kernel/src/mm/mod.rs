//! Memory management: frame allocator (§4.1), page tables (§4.2), and
//! the ZFOD VM syscalls and validators (§4.3).

pub mod bootloader;
pub mod frame_allocator;
pub mod heap;
pub mod page_table;
pub mod user_validation;
pub mod vmm;

pub fn init(boot_info_addr: usize) {
    bootloader::init_from_multiboot(boot_info_addr);
    heap::init();
    crate::println!("[MM] frame allocator, page tables, and kernel heap online");
}

/// Brings up the same memory state as [`init`] but over a synthetic
/// memory size instead of a real multiboot2 record, for the harness=false
/// integration tests in `tests/`, which have no GRUB to hand them one.
pub fn test_init(total_mem: usize) {
    bootloader::init_with_memory_size(total_mem);
    heap::init();
}
