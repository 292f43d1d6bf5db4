//! In-memory executable catalog (spec §6 collaborator): a flat
//! `{execname, execbytes, execlen}` array with a single `lookup(name)`
//! used by `readfile` and the process loader.
//!
//! The spec treats the actual set of user test programs as an external
//! collaborator named only by interface (§1); this kernel ships none
//! baked in, so the catalog starts empty and test harnesses populate it
//! with `register` before exercising `exec`/`readfile`.

pub struct CatalogEntry {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

const MAX_ENTRIES: usize = 32;

struct Catalog {
    entries: [Option<CatalogEntry>; MAX_ENTRIES],
    len: usize,
}

static CATALOG: spin::Mutex<Catalog> = spin::Mutex::new(Catalog {
    entries: [const { None }; MAX_ENTRIES],
    len: 0,
});

/// Registers one executable by name. Intended for boot-time population
/// from a linked-in blob or, in tests, from literal byte arrays.
pub fn register(name: &'static str, bytes: &'static [u8]) {
    let mut catalog = CATALOG.lock();
    if catalog.len < MAX_ENTRIES {
        let len = catalog.len;
        catalog.entries[len] = Some(CatalogEntry { name, bytes });
        catalog.len += 1;
    }
}

/// Looks up an executable by name, returning its bytes and length.
pub fn lookup(name: &str) -> Option<(&'static [u8], usize)> {
    let catalog = CATALOG.lock();
    catalog.entries[..catalog.len]
        .iter()
        .flatten()
        .find(|entry| entry.name == name)
        .map(|entry| (entry.bytes, entry.bytes.len()))
}
