//! Multiboot2 boot-info parsing into the frame allocator's memory map.
//!
//! Grounded on the `Caya231-AtomicOS` example's use of the `multiboot2`
//! crate (`BootInformation::load`, `memory_map_tag`), since the teacher's
//! own boot path used `bootloader_api`, which targets the `x86_64`
//! bootloader protocol and has no 32-bit multiboot2 equivalent.

use multiboot2::{BootInformation, BootInformationHeader};

use crate::mm::frame_allocator;
use crate::mm::page_table;

/// Backing storage for the frame bitmap. Sized for up to 512 MiB of user
/// memory above the 16 MiB kernel boundary (512 MiB / 4 KiB / 32 bits
/// per word).
const BITMAP_WORDS: usize = (512 * 1024 * 1024 / page_table::PAGE_SIZE) / 32;
static mut BITMAP_STORAGE: [u32; BITMAP_WORDS] = [0; BITMAP_WORDS];

/// Parses the multiboot2 info structure at `addr`, finds the highest
/// usable physical address from the memory map tag, and brings up the
/// frame allocator and shared kernel page tables over it.
pub fn init_from_multiboot(addr: usize) {
    // SAFETY: `addr` is the physical address GRUB (or any multiboot2
    // loader) passed in ebx at kernel entry, per the multiboot2 spec;
    // `boot.rs` preserves it unmodified into this call.
    let boot_info = unsafe {
        BootInformation::load(addr as *const BootInformationHeader)
            .expect("invalid multiboot2 boot information")
    };

    let total_mem = boot_info
        .memory_map_tag()
        .map(|tag| {
            tag.memory_areas()
                .iter()
                .map(|area| area.start_address() + area.size())
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(64 * 1024 * 1024) as usize;

    init_with_memory_size(total_mem);
}

/// The part of boot-time memory bring-up that does not depend on a real
/// multiboot2 record: frame allocator, zero frame, shared kernel tables.
/// Factored out so the harness=false integration tests can drive it with
/// a synthetic memory size instead of fabricating a `BootInformation`.
pub fn init_with_memory_size(total_mem: usize) {
    // SAFETY: runs once at boot before any frame allocation is
    // attempted; `BITMAP_STORAGE` has no other reference anywhere.
    let storage: &'static mut [u32] = unsafe { &mut *core::ptr::addr_of_mut!(BITMAP_STORAGE) };
    frame_allocator::init(total_mem, storage);

    let zero_frame = frame_allocator::allocate_frame().expect("no frame for zero page");
    // SAFETY: the frame was just allocated and is not referenced by any
    // page table yet.
    unsafe { core::ptr::write_bytes(zero_frame as *mut u8, 0, page_table::PAGE_SIZE) };
    frame_allocator::set_zero_frame(zero_frame);

    page_table::init_shared_kernel_tables().expect("failed to build shared kernel page tables");
}
