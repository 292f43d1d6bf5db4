//! Page table and ZFOD VM tests (spec §4.1-4.3, §4.9).
//!
//! Runs entirely against synthetic page directories built with
//! `page_table::new_directory`; never touches the scheduler, so none of
//! the context-switch-safety constraints documented in
//! `scheduler_tests.rs` apply here. `is_buffer_valid`/`is_valid_string`
//! are the one exception: they key off `sched::current_tcb`, which is
//! always `None` in this harness, so those two are exercised only for
//! their "no current thread" rejection path.

#![no_std]
#![no_main]

extern crate alloc;

use alloc::vec::Vec;

use pebble_kernel::error::KernelError;
use pebble_kernel::mm::page_table::{self, PageFlags};
use pebble_kernel::mm::user_validation::{is_buffer_valid, is_valid_string};
use pebble_kernel::mm::{frame_allocator, vmm};
use pebble_kernel::test_framework::{test_panic_handler, test_runner, Testable};

#[path = "common/mod.rs"]
mod common;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    common::init_test_env("vm_tests");
    test_runner(&[
        &test_new_directory_shares_kernel_region as &dyn Testable,
        &test_map_user_frame_round_trips,
        &test_new_pages_maps_zfod_reservation,
        &test_new_pages_rejects_unaligned_base,
        &test_new_pages_rejects_zero_len,
        &test_new_pages_rejects_unaligned_len,
        &test_remove_pages_unmaps_and_unreserves,
        &test_remove_pages_rejects_unknown_base,
        &test_try_resolve_zfod_fault_promotes_on_write,
        &test_try_resolve_zfod_fault_ignores_reads,
        &test_for_each_user_page_visits_every_mapping,
        &test_is_buffer_valid_false_without_current_thread,
        &test_is_valid_string_false_without_current_thread,
    ])
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_panic_handler(info)
}

const USER_BASE: u32 = 0x0200_0000; // 32 MiB, well above the 16 MiB kernel boundary

fn test_new_directory_shares_kernel_region() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    // Identity-mapped low memory must already be visible: the zero
    // frame is always mapped there by boot (see `tests/common`).
    assert!(page_table::lookup(dir_phys, 0).is_some());
}

fn test_map_user_frame_round_trips() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let frame = frame_allocator::allocate_frame().expect("out of frames");

    page_table::map_user_frame(dir_phys, USER_BASE, frame, true).expect("map must succeed");

    let entry = page_table::lookup(dir_phys, USER_BASE).expect("mapping must be visible");
    assert_eq!(entry.frame_addr(), frame as u32);
    assert!(entry.flags().contains(PageFlags::USER | PageFlags::WRITABLE));
}

fn test_new_pages_maps_zfod_reservation() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let before = frame_allocator::free_frame_count();

    let reservation =
        vmm::new_pages(dir_phys, USER_BASE, 2 * page_table::PAGE_SIZE).expect("reservation must succeed");
    assert_eq!(reservation.page_count, 2);
    assert_eq!(frame_allocator::free_frame_count(), before - 2);

    let entry = page_table::lookup(dir_phys, USER_BASE).expect("zfod page must be mapped");
    assert!(entry.is_zfod());
    assert_eq!(entry.frame_addr(), frame_allocator::zero_frame_addr() as u32);
}

fn test_new_pages_rejects_unaligned_base() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let err = vmm::new_pages(dir_phys, USER_BASE + 1, page_table::PAGE_SIZE).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArg { .. }));
}

fn test_new_pages_rejects_zero_len() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let err = vmm::new_pages(dir_phys, USER_BASE, 0).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArg { .. }));
}

fn test_new_pages_rejects_unaligned_len() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let err = vmm::new_pages(dir_phys, USER_BASE, page_table::PAGE_SIZE + 1).unwrap_err();
    assert!(matches!(err, KernelError::InvalidArg { .. }));
}

fn test_remove_pages_unmaps_and_unreserves() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let before = frame_allocator::free_frame_count();

    let reservation = vmm::new_pages(dir_phys, USER_BASE, page_table::PAGE_SIZE).expect("reservation must succeed");
    let mut reservations = alloc::vec![reservation];

    vmm::remove_pages(dir_phys, &mut reservations, USER_BASE).expect("removal must succeed");

    assert!(reservations.is_empty());
    assert_eq!(frame_allocator::free_frame_count(), before);
    assert!(page_table::lookup(dir_phys, USER_BASE).is_none());
}

fn test_remove_pages_rejects_unknown_base() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    let mut reservations = Vec::new();
    let err = vmm::remove_pages(dir_phys, &mut reservations, USER_BASE).unwrap_err();
    assert!(matches!(err, KernelError::NotFound { .. }));
}

fn test_try_resolve_zfod_fault_promotes_on_write() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    vmm::new_pages(dir_phys, USER_BASE, page_table::PAGE_SIZE).expect("reservation must succeed");

    vmm::try_resolve_zfod_fault(dir_phys, USER_BASE, true).expect("write fault must resolve");

    let entry = page_table::lookup(dir_phys, USER_BASE).expect("page must remain mapped");
    assert!(!entry.is_zfod());
    assert!(entry.flags().contains(PageFlags::WRITABLE));
    assert_ne!(entry.frame_addr(), frame_allocator::zero_frame_addr() as u32);
}

fn test_try_resolve_zfod_fault_ignores_reads() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    vmm::new_pages(dir_phys, USER_BASE, page_table::PAGE_SIZE).expect("reservation must succeed");

    let err = vmm::try_resolve_zfod_fault(dir_phys, USER_BASE, false).unwrap_err();
    assert!(matches!(err, KernelError::IllegalState { .. }));

    let entry = page_table::lookup(dir_phys, USER_BASE).expect("page must remain mapped");
    assert!(entry.is_zfod());
}

fn test_for_each_user_page_visits_every_mapping() {
    let dir_phys = page_table::new_directory().expect("out of frames");
    vmm::new_pages(dir_phys, USER_BASE, 3 * page_table::PAGE_SIZE).expect("reservation must succeed");

    let mut seen = Vec::new();
    page_table::for_each_user_page(dir_phys, |vaddr, _entry| seen.push(vaddr));

    seen.sort_unstable();
    assert_eq!(
        seen,
        alloc::vec![
            USER_BASE,
            USER_BASE + page_table::PAGE_SIZE as u32,
            USER_BASE + 2 * page_table::PAGE_SIZE as u32,
        ]
    );
}

fn test_is_buffer_valid_false_without_current_thread() {
    assert!(!is_buffer_valid(USER_BASE, 16, true));
}

fn test_is_valid_string_false_without_current_thread() {
    assert!(!is_valid_string(USER_BASE));
}
