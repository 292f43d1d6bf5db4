//! ELF32 type definitions for the static executable catalog loader.
//!
//! Trimmed from the teacher's ELF64 definitions down to the ELF32
//! fields `crate::elf` actually parses: the spec's "ELF parser" external
//! collaborator (§6) only needs segment offsets/sizes/addresses and the
//! entry point, not relocations, symbols, or dynamic sections (dynamic
//! loading is an explicit non-goal).

pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    None = 0,
    Elf32 = 1,
    Elf64 = 2,
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramHeaderType {
    Null = 0,
    Load = 1,
    Dynamic = 2,
    Interp = 3,
    Note = 4,
    Other = 0xFFFF,
}

impl From<u32> for ProgramHeaderType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::Load,
            2 => Self::Dynamic,
            3 => Self::Interp,
            4 => Self::Note,
            _ => Self::Other,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXEC  = 1 << 0;
        const WRITE = 1 << 1;
        const READ  = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Elf32Header {
    pub class: ElfClass,
    pub entry: u32,
    pub program_header_offset: u32,
    pub program_header_count: u16,
    pub program_header_entry_size: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramHeader {
    pub ty: ProgramHeaderType,
    pub flags: SegmentFlags,
    pub offset: u32,
    pub vaddr: u32,
    pub file_size: u32,
    pub mem_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    BadMagic,
    UnsupportedClass,
    Truncated,
}
