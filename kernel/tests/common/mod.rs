//! Shared bring-up for the harness=false integration test binaries:
//! enough hardware state (GDT/IDT/PIC, a synthetic frame allocator, the
//! kernel heap, and boot paging) for scheduler/process/vm code to run
//! without a real multiboot2 boot record.

use pebble_kernel::{arch, bootstrap, mm, process, sched};

const TEST_MEM_SIZE: usize = 64 * 1024 * 1024;

pub fn init_test_env(name: &str) {
    pebble_kernel::serial_println!("=== {} ===", name);
    // SAFETY: each test binary calls this exactly once, at the very
    // start of its `_start`, before any other kernel code runs.
    unsafe { arch::x86::init() };
    mm::test_init(TEST_MEM_SIZE);
    bootstrap::enable_boot_paging();
    sched::init();
    process::init();
}
