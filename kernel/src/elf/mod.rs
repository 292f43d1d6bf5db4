//! Minimal ELF32 parser (spec §6 "ELF parser" collaborator): given an
//! in-memory executable's bytes, yields segment offsets/sizes/start
//! addresses (text, data, rodata, bss, entry, stack default top) for the
//! loader in [`crate::process::loader`].

pub mod types;

use types::{Elf32Header, ElfClass, ElfError, ProgramHeader, ProgramHeaderType, SegmentFlags};

const EI_CLASS: usize = 4;
const E_ENTRY: usize = 24;
const E_PHOFF: usize = 28;
const E_PHENTSIZE: usize = 42;
const E_PHNUM: usize = 44;

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

pub fn parse_header(bytes: &[u8]) -> Result<Elf32Header, ElfError> {
    if bytes.len() < 52 || bytes[0..4] != types::ELF_MAGIC {
        return Err(ElfError::BadMagic);
    }
    if bytes[EI_CLASS] != ElfClass::Elf32 as u8 {
        return Err(ElfError::UnsupportedClass);
    }
    Ok(Elf32Header {
        class: ElfClass::Elf32,
        entry: read_u32(bytes, E_ENTRY),
        program_header_offset: read_u32(bytes, E_PHOFF),
        program_header_count: read_u16(bytes, E_PHNUM),
        program_header_entry_size: read_u16(bytes, E_PHENTSIZE),
    })
}

pub fn program_headers<'a>(
    bytes: &'a [u8],
    header: &Elf32Header,
) -> Result<impl Iterator<Item = ProgramHeader> + 'a, ElfError> {
    let start = header.program_header_offset as usize;
    let entry_size = header.program_header_entry_size as usize;
    let count = header.program_header_count as usize;
    let end = start
        .checked_add(entry_size.checked_mul(count).ok_or(ElfError::Truncated)?)
        .ok_or(ElfError::Truncated)?;
    if end > bytes.len() {
        return Err(ElfError::Truncated);
    }

    Ok((0..count).map(move |i| {
        let base = start + i * entry_size;
        ProgramHeader {
            ty: ProgramHeaderType::from(read_u32(bytes, base)),
            flags: SegmentFlags::from_bits_truncate(read_u32(bytes, base + 24)),
            offset: read_u32(bytes, base + 4),
            vaddr: read_u32(bytes, base + 8),
            file_size: read_u32(bytes, base + 16),
            mem_size: read_u32(bytes, base + 20),
        }
    }))
}

/// The loader's view of one `PT_LOAD` segment, classified the way the
/// original loader's stack setup and permission rules expect: text/
/// rodata get user-RO mappings, data/bss get user-RW (spec §4.2 "Map
/// user frame").
#[derive(Debug, Clone, Copy)]
pub struct LoadSegment {
    pub vaddr: u32,
    pub file_offset: u32,
    pub file_size: u32,
    pub mem_size: u32,
    pub writable: bool,
}

pub fn load_segments<'a>(
    bytes: &'a [u8],
    header: &Elf32Header,
) -> Result<impl Iterator<Item = LoadSegment> + 'a, ElfError> {
    Ok(program_headers(bytes, header)?
        .filter(|ph| ph.ty == ProgramHeaderType::Load)
        .map(|ph| LoadSegment {
            vaddr: ph.vaddr,
            file_offset: ph.offset,
            file_size: ph.file_size,
            mem_size: ph.mem_size,
            writable: ph.flags.contains(SegmentFlags::WRITE),
        }))
}
