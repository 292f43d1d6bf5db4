//! Two-level page table operations (spec §4.2, §3 "Page table").
//!
//! Addresses split `dir_index:10 | tab_index:10 | offset:12`. Entries
//! carry `{frame_addr:20, flags:12}`, with one of the reserved flag bits
//! repurposed as "ZFOD requested" (spec §3) instead of the teacher's
//! 4-level, 52-bit-physical-address PAE-style tables.

use alloc::alloc::{alloc, dealloc, Layout};

use bitflags::bitflags;

use crate::arch::barriers::memory_fence;
use crate::error::{KernelError, KernelResult};
use crate::mm::frame_allocator;

pub const ENTRIES_PER_TABLE: usize = 1024;
pub const PAGE_SIZE: usize = 4096;

/// Number of directory entries that map the shared, identity-mapped
/// kernel region below 16 MiB (4 tables * 1024 entries * 4 KiB = 16 MiB).
pub const KERNEL_DIRECTORY_ENTRIES: usize = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        const PRESENT  = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER     = 1 << 2;
        const GLOBAL   = 1 << 8;
        /// Reserved bit repurposed to mark a ZFOD reservation (spec §3).
        const ZFOD     = 1 << 9;
    }
}

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Entry(u32);

impl Entry {
    pub const EMPTY: Entry = Entry(0);

    pub fn new(frame_addr: u32, flags: PageFlags) -> Self {
        Self((frame_addr & 0xFFFFF000) | flags.bits())
    }

    pub fn is_present(self) -> bool {
        PageFlags::from_bits_truncate(self.0).contains(PageFlags::PRESENT)
    }

    pub fn is_zfod(self) -> bool {
        PageFlags::from_bits_truncate(self.0).contains(PageFlags::ZFOD)
    }

    pub fn frame_addr(self) -> u32 {
        self.0 & 0xFFFFF000
    }

    pub fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0)
    }
}

#[repr(C, align(4096))]
pub struct Table {
    pub entries: [Entry; ENTRIES_PER_TABLE],
}

impl Table {
    fn zeroed_at(phys_addr: usize) -> &'static mut Table {
        // SAFETY: `phys_addr` was just allocated as a fresh page frame
        // and is identity-mapped kernel memory (below 16 MiB) or has
        // been temporarily mapped by the caller.
        let table = unsafe { &mut *(phys_addr as *mut Table) };
        for entry in table.entries.iter_mut() {
            *entry = Entry::EMPTY;
        }
        table
    }
}

pub fn dir_index(vaddr: u32) -> usize {
    (vaddr >> 22) as usize
}

pub fn tab_index(vaddr: u32) -> usize {
    ((vaddr >> 12) & 0x3FF) as usize
}

pub fn page_offset(vaddr: u32) -> u32 {
    vaddr & 0xFFF
}

/// A directory or page table is read back by casting its own physical
/// address to a `*mut Table` (see `Table::zeroed_at`/`zeroed_dont_clear`
/// below), which only works while that address is directly mapped.
/// Every task's directory identity-maps just `[0, 16 MiB)` (spec §4.2
/// "Map kernel"), so PD/PT storage itself must come from that same
/// range rather than from [`frame_allocator`], which only ever hands out
/// frames at or above the 16 MiB boundary for user data. The kernel heap
/// lives in that low region, so directories and tables are allocated
/// from it directly -- mirroring the original kernel's page tables,
/// allocated via `smemalign` out of the kernel heap rather than tracked
/// in the free-user-frame bitmap.
fn table_layout() -> Layout {
    Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).expect("table layout is a fixed power-of-two size")
}

fn alloc_table_frame() -> KernelResult<usize> {
    // SAFETY: layout is a fixed nonzero power-of-two size/align.
    let ptr = unsafe { alloc(table_layout()) };
    if ptr.is_null() {
        return Err(KernelError::OutOfResource {
            requested: 1,
            available: 0,
        });
    }
    Ok(ptr as usize)
}

fn free_table_frame(phys_addr: usize) {
    // SAFETY: `phys_addr` was returned by `alloc_table_frame` and is
    // freed exactly once, with the same layout it was allocated with.
    unsafe { dealloc(phys_addr as *mut u8, table_layout()) };
}

/// Allocates a fresh page directory. The first `KERNEL_DIRECTORY_ENTRIES`
/// entries are pointer-copied from the permanently shared kernel tables
/// so every address space sees the same low 16 MiB (spec §4.2 "Map
/// kernel").
pub fn new_directory() -> KernelResult<usize> {
    let dir_phys = alloc_table_frame()?;
    let dir = Table::zeroed_at(dir_phys);

    let kernel_tables = shared_kernel_tables();
    for (i, &table_phys) in kernel_tables.iter().enumerate() {
        dir.entries[i] = Entry::new(
            table_phys as u32,
            PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::GLOBAL,
        );
    }
    Ok(dir_phys)
}

static mut SHARED_KERNEL_TABLES: [usize; KERNEL_DIRECTORY_ENTRIES] = [0; KERNEL_DIRECTORY_ENTRIES];

/// Builds the four statically pinned kernel page tables that identity
/// map `[0, 16 MiB)`. Called once at boot.
pub fn init_shared_kernel_tables() -> KernelResult<()> {
    let mut tables = [0usize; KERNEL_DIRECTORY_ENTRIES];
    for (i, slot) in tables.iter_mut().enumerate() {
        let table_phys = alloc_table_frame()?;
        let table = Table::zeroed_at(table_phys);
        for (j, entry) in table.entries.iter_mut().enumerate() {
            let frame = (i * ENTRIES_PER_TABLE + j) * PAGE_SIZE;
            *entry = Entry::new(
                frame as u32,
                PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::GLOBAL,
            );
        }
        *slot = table_phys;
    }
    // SAFETY: runs once at boot before any other CPU activity touches
    // this table; no concurrent access is possible.
    unsafe { SHARED_KERNEL_TABLES = tables };
    Ok(())
}

fn shared_kernel_tables() -> [usize; KERNEL_DIRECTORY_ENTRIES] {
    // SAFETY: only ever written once, by `init_shared_kernel_tables`,
    // before any reader can observe it.
    unsafe { SHARED_KERNEL_TABLES }
}

/// Walks (and lazily creates) the table for `vaddr` within `dir_phys`,
/// returning its physical address.
fn walk_or_create_table(dir_phys: usize, vaddr: u32) -> KernelResult<usize> {
    let dir = Table::zeroed_dont_clear(dir_phys);
    let di = dir_index(vaddr);
    let entry = dir.entries[di];
    if entry.is_present() {
        return Ok(entry.frame_addr() as usize);
    }
    let table_phys = alloc_table_frame()?;
    Table::zeroed_at(table_phys);
    dir.entries[di] = Entry::new(
        table_phys as u32,
        PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER,
    );
    Ok(table_phys)
}

impl Table {
    /// Borrows an already-initialized table without clearing it.
    fn zeroed_dont_clear(phys_addr: usize) -> &'static mut Table {
        // SAFETY: `phys_addr` is a live page-directory or page-table
        // frame, identity-mapped in kernel space.
        unsafe { &mut *(phys_addr as *mut Table) }
    }
}

/// Maps one user frame at `vaddr` with the given permissions, allocating
/// directory/table entries as needed (spec §4.2 "Map user frame").
pub fn map_user_frame(
    dir_phys: usize,
    vaddr: u32,
    frame_phys: usize,
    writable: bool,
) -> KernelResult<()> {
    let table_phys = walk_or_create_table(dir_phys, vaddr)?;
    let table = Table::zeroed_dont_clear(table_phys);
    let ti = tab_index(vaddr);
    let mut flags = PageFlags::PRESENT | PageFlags::USER;
    if writable {
        flags |= PageFlags::WRITABLE;
    }
    table.entries[ti] = Entry::new(frame_phys as u32, flags);
    invalidate_page(vaddr);
    Ok(())
}

/// Maps `vaddr` read-only against the shared zero frame with the ZFOD
/// bit set, per the spec's reservation bookkeeping.
pub fn map_zfod_reservation(dir_phys: usize, vaddr: u32) -> KernelResult<()> {
    let table_phys = walk_or_create_table(dir_phys, vaddr)?;
    let table = Table::zeroed_dont_clear(table_phys);
    let ti = tab_index(vaddr);
    table.entries[ti] = Entry::new(
        frame_allocator::zero_frame_addr() as u32,
        PageFlags::PRESENT | PageFlags::USER | PageFlags::ZFOD,
    );
    invalidate_page(vaddr);
    Ok(())
}

/// Promotes a ZFOD reservation to a private writable frame on first
/// write fault.
pub fn promote_zfod(dir_phys: usize, vaddr: u32) -> KernelResult<()> {
    let table_phys = walk_or_create_table(dir_phys, vaddr)?;
    let table = Table::zeroed_dont_clear(table_phys);
    let ti = tab_index(vaddr);
    let entry = table.entries[ti];
    if !entry.is_zfod() {
        return Err(KernelError::IllegalState {
            reason: "page is not a ZFOD reservation",
        });
    }
    let frame_phys = frame_allocator::allocate_reserved_frame()?;
    zero_frame_via_temp_mapping(frame_phys);
    table.entries[ti] = Entry::new(
        frame_phys as u32,
        PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::USER,
    );
    invalidate_page(vaddr);
    Ok(())
}

/// A fixed virtual address inside the shared low-16 MiB kernel region,
/// used to briefly map one arbitrary physical frame for content access.
/// Because the four kernel tables are pointer-copied (not deep-copied)
/// into every task's directory, repointing this one entry is visible
/// under any `cr3` without a directory switch -- the spec's "temporary
/// `cr3` switch to the target directory" collapsed to a single shared
/// PTE since the kernel region is already common to every address space.
pub const SCRATCH_VADDR: u32 = 0x00F0_0000;

/// Points the scratch slot at `frame_phys` and returns a pointer to it.
/// Callers must not hold the mapping across a context switch or a
/// re-entrant call to `map_scratch` (it is one shared slot, protected
/// implicitly by this kernel's disable-interrupts-around-critical-section
/// discipline, spec §5).
pub fn map_scratch(frame_phys: usize) -> *mut u8 {
    let di = dir_index(SCRATCH_VADDR);
    let ti = tab_index(SCRATCH_VADDR);
    let table_phys = shared_kernel_tables()[di];
    let table = Table::zeroed_dont_clear(table_phys);
    table.entries[ti] = Entry::new(
        frame_phys as u32,
        PageFlags::PRESENT | PageFlags::WRITABLE | PageFlags::GLOBAL,
    );
    invalidate_page(SCRATCH_VADDR);
    SCRATCH_VADDR as *mut u8
}

/// Zeros a freshly allocated frame through the scratch mapping.
fn zero_frame_via_temp_mapping(frame_phys: usize) {
    let dst = map_scratch(frame_phys);
    // SAFETY: `map_scratch` just pointed the scratch slot at `frame_phys`,
    // a frame not yet referenced by any other mapping.
    unsafe {
        core::ptr::write_bytes(dst, 0, PAGE_SIZE);
    }
}

fn invalidate_page(vaddr: u32) {
    // SAFETY: `invlpg` only affects the TLB entry for `vaddr`; always
    // safe to issue.
    unsafe {
        core::arch::asm!("invlpg [{0}]", in(reg) vaddr, options(nostack, preserves_flags));
    }
    memory_fence();
}

/// Tears down every user-space mapping (skipping the four shared kernel
/// directory entries) and frees the frames and tables themselves, then
/// the directory. When `keep_user_frames` is set, only the kernel
/// references are dropped -- used right after `exec` installs a new
/// directory on the same thread so the old directory's frames, which
/// are still owned by the still-live task, are not double-freed.
pub fn teardown_directory(dir_phys: usize, keep_user_frames: bool) {
    let dir = Table::zeroed_dont_clear(dir_phys);
    for entry in dir.entries.iter_mut().skip(KERNEL_DIRECTORY_ENTRIES) {
        if !entry.is_present() {
            continue;
        }
        let table_phys = entry.frame_addr() as usize;
        if !keep_user_frames {
            let table = Table::zeroed_dont_clear(table_phys);
            for page_entry in table.entries.iter() {
                if page_entry.is_present() {
                    let frame = page_entry.frame_addr() as usize;
                    if frame >= frame_allocator::KERNEL_BOUNDARY {
                        frame_allocator::free_frame(frame);
                    }
                }
            }
            free_table_frame(table_phys);
        }
        *entry = Entry::EMPTY;
    }
    if !keep_user_frames {
        free_table_frame(dir_phys);
    }
}

/// Invokes `f(vaddr, entry)` for every present user-space mapping (the
/// shared kernel directory entries are skipped), in ascending address
/// order. Used by `fork` to walk the parent's address space for copying.
pub fn for_each_user_page(dir_phys: usize, mut f: impl FnMut(u32, Entry)) {
    let dir = Table::zeroed_dont_clear(dir_phys);
    for (di, dir_entry) in dir.entries.iter().enumerate().skip(KERNEL_DIRECTORY_ENTRIES) {
        if !dir_entry.is_present() {
            continue;
        }
        let table = Table::zeroed_dont_clear(dir_entry.frame_addr() as usize);
        for (ti, entry) in table.entries.iter().enumerate() {
            if entry.is_present() {
                let vaddr = ((di as u32) << 22) | ((ti as u32) << 12);
                f(vaddr, *entry);
            }
        }
    }
}

/// Looks up the entry mapping `vaddr`, if any.
pub fn lookup(dir_phys: usize, vaddr: u32) -> Option<Entry> {
    let dir = Table::zeroed_dont_clear(dir_phys);
    let di = dir_index(vaddr);
    let dir_entry = dir.entries[di];
    if !dir_entry.is_present() {
        return None;
    }
    let table = Table::zeroed_dont_clear(dir_entry.frame_addr() as usize);
    let entry = table.entries[tab_index(vaddr)];
    entry.is_present().then_some(entry)
}
