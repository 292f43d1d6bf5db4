//! Kernel heap, backed by `linked_list_allocator` (the spec's "generic
//! malloc library" external collaborator, §1).

use linked_list_allocator::LockedHeap;

pub const HEAP_SIZE: usize = 1024 * 1024;

static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

pub fn init() {
    // SAFETY: runs once at boot, before any allocation is attempted, and
    // `HEAP_MEMORY` is never referenced anywhere else.
    unsafe {
        let start = core::ptr::addr_of_mut!(HEAP_MEMORY) as *mut u8;
        ALLOCATOR.lock().init(start, HEAP_SIZE);
    }
}
