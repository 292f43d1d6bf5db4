//! 32-bit Global Descriptor Table and Task State Segment.
//!
//! Mirrors the teacher's `gdt.rs` (GDT + TSS built with `lazy_static`,
//! kernel stack installed into the TSS on every context switch) but with
//! hand-rolled 8-byte protected-mode descriptors instead of the `x86_64`
//! crate's long-mode ones, which use a different (16-byte) TSS descriptor
//! and don't build for this target at all.

use core::arch::asm;
use core::mem::size_of;

use lazy_static::lazy_static;
use spin::Mutex;

pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
pub const USER_CODE_SELECTOR: u16 = 0x1B; // index 3, RPL 3
pub const USER_DATA_SELECTOR: u16 = 0x23; // index 4, RPL 3
const TSS_SELECTOR: u16 = 0x28;

const GDT_ENTRIES: usize = 6;

#[derive(Clone, Copy, Default)]
#[repr(C, packed)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn new(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access,
            granularity: (((limit >> 16) & 0x0F) as u8) | (flags << 4),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }
}

#[derive(Clone, Copy)]
#[repr(C, packed)]
struct GdtPointer {
    limit: u16,
    base: u32,
}

/// 32-bit hardware TSS. Only `esp0`/`ss0` (ring 0 stack for privilege-level
/// transitions) and `iomap_base` are meaningfully used; this kernel does
/// hardware task switching for exactly nothing (context switch is done in
/// software), so the rest of the fields are zeroed and inert.
#[derive(Clone, Copy, Default)]
#[repr(C, packed)]
pub struct TaskStateSegment {
    prev_tss: u32,
    pub esp0: u32,
    pub ss0: u32,
    esp1: u32,
    ss1: u32,
    esp2: u32,
    ss2: u32,
    cr3: u32,
    eip: u32,
    eflags: u32,
    eax: u32,
    ecx: u32,
    edx: u32,
    ebx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    es: u32,
    cs: u32,
    ss: u32,
    ds: u32,
    fs: u32,
    gs: u32,
    ldt: u32,
    trap: u16,
    iomap_base: u16,
}

struct GdtTable {
    entries: [GdtEntry; GDT_ENTRIES],
    tss: TaskStateSegment,
}

lazy_static! {
    static ref GDT: Mutex<GdtTable> = Mutex::new(GdtTable {
        entries: [
            GdtEntry::new(0, 0, 0, 0), // null
            GdtEntry::new(0, 0xFFFFF, 0x9A, 0xC), // kernel code, ring 0
            GdtEntry::new(0, 0xFFFFF, 0x92, 0xC), // kernel data, ring 0
            GdtEntry::new(0, 0xFFFFF, 0xFA, 0xC), // user code, ring 3
            GdtEntry::new(0, 0xFFFFF, 0xF2, 0xC), // user data, ring 3
            GdtEntry::new(0, 0, 0, 0),             // TSS, patched in init()
        ],
        tss: TaskStateSegment {
            prev_tss: 0, esp0: 0, ss0: KERNEL_DATA_SELECTOR as u32,
            esp1: 0, ss1: 0, esp2: 0, ss2: 0,
            cr3: 0, eip: 0, eflags: 0, eax: 0, ecx: 0, edx: 0, ebx: 0,
            esp: 0, ebp: 0, esi: 0, edi: 0, es: 0, cs: 0, ss: 0, ds: 0,
            fs: 0, gs: 0, ldt: 0, trap: 0,
            iomap_base: size_of::<TaskStateSegment>() as u16,
        },
    });
}

/// Installs the GDT and TSS and reloads every segment register.
///
/// # Safety
/// Must run once, during early boot, before any user-mode entry.
pub unsafe fn init() {
    let mut table = GDT.lock();
    let tss_base = &table.tss as *const _ as u32;
    let tss_limit = (size_of::<TaskStateSegment>() - 1) as u32;
    table.entries[5] = GdtEntry::new(tss_base, tss_limit, 0x89, 0x0);

    let pointer = GdtPointer {
        limit: (size_of::<[GdtEntry; GDT_ENTRIES]>() - 1) as u16,
        base: table.entries.as_ptr() as u32,
    };
    drop(table);

    // SAFETY: loads the GDT and reloads every segment selector to match
    // the freshly-installed kernel code/data descriptors, then loads the
    // TSS selector. This is the standard 32-bit protected-mode GDT
    // bring-up sequence.
    unsafe {
        asm!("lgdt [{0}]", in(reg) &pointer, options(readonly, nostack, preserves_flags));
        asm!(
            "push {code_sel}",
            "lea {tmp}, [1f]",
            "push {tmp}",
            "retf",
            "1:",
            "mov ax, {data_sel:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "mov ss, ax",
            code_sel = in(reg) KERNEL_CODE_SELECTOR as u32,
            data_sel = in(reg) KERNEL_DATA_SELECTOR,
            tmp = out(reg) _,
            out("ax") _,
        );
        asm!("ltr {0:x}", in(reg) TSS_SELECTOR, options(nostack, preserves_flags));
    }
}

/// Updates `esp0` in the TSS so the next ring3->ring0 transition lands on
/// the given kernel stack. Called by the scheduler on every context
/// switch, exactly like the teacher's `set_kernel_stack`.
pub fn set_kernel_stack(esp0: u32) {
    GDT.lock().tss.esp0 = esp0;
}
