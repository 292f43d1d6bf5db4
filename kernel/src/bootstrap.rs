//! Boot sequence: the linear bring-up [`crate::kernel_main`] runs once,
//! grounded on `original_source/kern/kernel.c`'s `kernel_main` (serial,
//! console, IDT/GDT, memory, the init task, then "go").
//!
//! There is exactly one CPU and exactly one boot; every step below runs
//! once, in order, with interrupts disabled until the very end.

use crate::{arch, drivers, mm, process, sched};

/// The catalog name of the first task. This kernel ships no executables
/// of its own (spec §6's catalog is an external collaborator); a real
/// boot image links one in via [`crate::catalog::register`] before
/// calling this function, and an empty catalog just means the kernel
/// idles with nothing runnable instead of panicking.
const INIT_PROGRAM: &str = "init";

/// Runs the full boot sequence and falls into the idle loop. Never
/// returns.
pub fn boot(boot_info_addr: usize) -> ! {
    // SAFETY: this is the one and only boot, interrupts are already off
    // (GRUB leaves them disabled), and no other code has run yet.
    unsafe { arch::x86::init() };

    crate::serial_println!("pebble-kernel: GDT/IDT/PIC online");
    crate::logging::init();
    log::info!("boot: multiboot info at {:#x}", boot_info_addr);

    mm::init(boot_info_addr);
    enable_boot_paging();

    drivers::init();
    sched::init();
    process::init();

    match process::creation::create_first_task(INIT_PROGRAM) {
        Ok(()) => log::info!("boot: first task \"{INIT_PROGRAM}\" runnable"),
        Err(e) => log::warn!("boot: no first task ({e}); idling with nothing runnable"),
    }

    sched::mark_kernel_ready();
    arch::x86::enable_interrupts();

    idle_loop()
}

/// Builds a kernel-only page directory (the shared tables
/// [`mm::bootloader::init_from_multiboot`] just populated, nothing
/// user-specific yet) and switches to it, since every later context
/// switch expects `cr3` to already be tracking per-thread state.
///
/// Public so the harness=false integration tests, which call [`mm::test_init`]
/// instead of [`mm::init`], can reach the same paging state without going
/// through the rest of [`boot`].
pub fn enable_boot_paging() {
    let dir_phys = mm::page_table::new_directory().expect("no frame for the boot page directory");
    arch::x86::mmu::write_cr3(dir_phys as u32);
    // SAFETY: `dir_phys` identity-maps the first 16 MiB, which covers
    // the kernel image, boot stack, and heap this code is currently
    // running from.
    unsafe { arch::x86::mmu::enable_paging() };
    crate::println!("[MM] paging enabled");
}

/// Parks the CPU between interrupts. The scheduler's timer tick and IRQ
/// handlers do all the real work of picking what (if anything) runs
/// next; this loop only exists for the case where nothing is runnable.
fn idle_loop() -> ! {
    loop {
        arch::x86::halt();
    }
}
