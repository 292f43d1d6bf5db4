//! Process table and PCB bookkeeping tests (spec §3), plus the ELF32
//! parser (spec §6 "ELF parser" collaborator) against synthetic images.
//!
//! Like `scheduler_tests.rs`, this never calls `fork`/`wait`/`vanish`/
//! `thread_fork`/`loader::exec`: all of those need `sched::current_tcb`
//! to return `Some`, which only a real context switch can arrange, and
//! this single-threaded harness has no way back from one. Instead this
//! drives `process::table` and `PcbGuarded`'s fields directly, the way
//! `wait`/`vanish` themselves do internally.

#![no_std]
#![no_main]

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use pebble_kernel::elf::types::ElfError;
use pebble_kernel::elf::{load_segments, parse_header, program_headers};
use pebble_kernel::process::pcb::{Pcb, TaskState};
use pebble_kernel::process::table;
use pebble_kernel::test_framework::{test_panic_handler, test_runner, Testable};

#[path = "common/mod.rs"]
mod common;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    common::init_test_env("process_tests");
    test_runner(&[
        &test_next_task_id_never_zero as &dyn Testable,
        &test_register_lookup_remove_round_trips,
        &test_lookup_missing_task_is_none,
        &test_init_task_slot,
        &test_pcb_starts_running_with_one_thread,
        &test_zombie_transition_and_exit_status,
        &test_live_child_becomes_reaped,
        &test_page_directory_replaced_by_exec,
        &test_parse_header_rejects_bad_magic,
        &test_parse_header_accepts_well_formed_image,
        &test_load_segments_skips_non_load_phdrs,
        &test_program_headers_rejects_truncated_table,
    ])
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_panic_handler(info)
}

fn new_pcb(task_id: u32) -> Arc<Pcb> {
    let dir_phys = pebble_kernel::mm::page_table::new_directory().expect("out of frames");
    Pcb::new(task_id, task_id, dir_phys as u32, None)
}

fn test_next_task_id_never_zero() {
    for _ in 0..8 {
        assert_ne!(table::next_task_id(), 0);
    }
}

fn test_register_lookup_remove_round_trips() {
    let tid = table::next_task_id();
    let pcb = new_pcb(tid);
    table::register(pcb);

    let found = table::lookup(tid).expect("just-registered pcb must be findable");
    assert_eq!(found.task_id, tid);

    table::remove(tid);
    assert!(table::lookup(tid).is_none());
}

fn test_lookup_missing_task_is_none() {
    let never_registered = table::next_task_id();
    assert!(table::lookup(never_registered).is_none());
}

fn test_init_task_slot() {
    let tid = table::next_task_id();
    let pcb = new_pcb(tid);
    table::set_init_task(pcb.clone());
    let found = table::init_task().expect("init task must be set");
    assert_eq!(found.task_id, pcb.task_id);
}

fn test_pcb_starts_running_with_one_thread() {
    let pcb = new_pcb(table::next_task_id());
    assert!(!pcb.is_zombie());
    let guard = pcb.guarded.lock();
    assert_eq!(guard.state, TaskState::Running);
    assert_eq!(guard.live_thread_count, 1);
    assert_eq!(guard.exit_status, 0);
    assert!(guard.live_children.is_empty());
}

fn test_zombie_transition_and_exit_status() {
    let pcb = new_pcb(table::next_task_id());
    {
        let mut guard = pcb.guarded.lock();
        guard.state = TaskState::Zombie;
        guard.exit_status = 42;
    }
    assert!(pcb.is_zombie());
    assert_eq!(pcb.guarded.lock().exit_status, 42);
}

fn test_live_child_becomes_reaped() {
    let parent = new_pcb(table::next_task_id());
    let child = new_pcb(table::next_task_id());
    parent.guarded.lock().live_children.push(child.clone());
    assert_eq!(parent.guarded.lock().live_children.len(), 1);

    let removed = {
        let mut guard = parent.guarded.lock();
        let idx = guard
            .live_children
            .iter()
            .position(|c| Arc::ptr_eq(c, &child))
            .expect("child must be in live_children");
        guard.live_children.remove(idx)
    };
    parent.guarded.lock().reaped_children.push(removed);

    let guard = parent.guarded.lock();
    assert!(guard.live_children.is_empty());
    assert_eq!(guard.reaped_children.len(), 1);
    assert_eq!(guard.reaped_children[0].task_id, child.task_id);
}

fn test_page_directory_replaced_by_exec() {
    let pcb = new_pcb(table::next_task_id());
    let original = pcb.page_directory();
    let new_dir = pebble_kernel::mm::page_table::new_directory().expect("out of frames");
    pcb.set_page_directory(new_dir as u32);
    assert_ne!(pcb.page_directory(), original);
    assert_eq!(pcb.page_directory(), new_dir as u32);
}

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: usize = 32;

/// Builds a minimal well-formed ELF32 image: a `PT_LOAD` text segment
/// plus (optionally) further program headers, packed at the byte
/// offsets `crate::elf` reads directly.
fn synthetic_elf(phdrs: &[(u32, u32, u32)]) -> Vec<u8> {
    let phoff = EHDR_SIZE;
    let mut bytes = alloc::vec![0u8; phoff + phdrs.len() * PHDR_SIZE];

    bytes[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    bytes[4] = 1; // EI_CLASS = ELFCLASS32
    bytes[24..28].copy_from_slice(&0x1000_u32.to_le_bytes()); // e_entry
    bytes[28..32].copy_from_slice(&(phoff as u32).to_le_bytes()); // e_phoff
    bytes[42..44].copy_from_slice(&(PHDR_SIZE as u16).to_le_bytes()); // e_phentsize
    bytes[44..46].copy_from_slice(&(phdrs.len() as u16).to_le_bytes()); // e_phnum

    for (i, (ty, vaddr, size)) in phdrs.iter().enumerate() {
        let base = phoff + i * PHDR_SIZE;
        bytes[base..base + 4].copy_from_slice(&ty.to_le_bytes());
        bytes[base + 8..base + 12].copy_from_slice(&vaddr.to_le_bytes());
        bytes[base + 16..base + 20].copy_from_slice(&size.to_le_bytes());
        bytes[base + 20..base + 24].copy_from_slice(&size.to_le_bytes());
        bytes[base + 24..base + 28].copy_from_slice(&(1u32 << 2).to_le_bytes()); // READ
    }
    bytes
}

fn test_parse_header_rejects_bad_magic() {
    let mut bytes = synthetic_elf(&[(1, 0x1000, 0x100)]);
    bytes[0] = 0;
    assert!(matches!(parse_header(&bytes), Err(ElfError::BadMagic)));
}

fn test_parse_header_accepts_well_formed_image() {
    let bytes = synthetic_elf(&[(1, 0x1000, 0x100)]);
    let header = parse_header(&bytes).expect("well-formed header must parse");
    assert_eq!(header.entry, 0x1000);
    assert_eq!(header.program_header_count, 1);
}

fn test_load_segments_skips_non_load_phdrs() {
    let bytes = synthetic_elf(&[(1, 0x1000, 0x200), (4, 0x2000, 0x40)]);
    let header = parse_header(&bytes).expect("well-formed header must parse");
    let segments: Vec<_> = load_segments(&bytes, &header).expect("segments must iterate").collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].vaddr, 0x1000);
    assert_eq!(segments[0].mem_size, 0x200);
}

fn test_program_headers_rejects_truncated_table() {
    let mut bytes = synthetic_elf(&[(1, 0x1000, 0x100), (1, 0x2000, 0x100)]);
    bytes.truncate(EHDR_SIZE + PHDR_SIZE); // header claims 2 entries, only 1 fits
    let header = parse_header(&bytes).expect("well-formed header must parse");
    assert_eq!(
        program_headers(&bytes, &header).err(),
        Some(ElfError::Truncated)
    );
}
