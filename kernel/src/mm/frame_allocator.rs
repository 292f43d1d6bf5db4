//! Physical frame allocator (spec §4.1).
//!
//! A fixed bitmap covers every user frame at or above the 16 MiB kernel
//! boundary. Allocation is a linear scan for a clear bit; free clears
//! the bit. `free_frame_count` is tracked separately so `reserve_frames`
//! can fail atomically before any bit is touched. Trimmed down from the
//! teacher's bitmap+buddy+NUMA hybrid allocator to the single flat
//! bitmap the spec calls for.

use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::error::{KernelError, KernelResult};

pub const FRAME_SIZE: usize = 4096;
pub const KERNEL_BOUNDARY: usize = 16 * 1024 * 1024;

/// One word covers 32 frames.
const BITS_PER_WORD: usize = 32;

struct BitmapState {
    words: &'static mut [u32],
    base_frame: usize,
}

static FREE_FRAME_COUNT: AtomicUsize = AtomicUsize::new(0);
static ZERO_FRAME: AtomicUsize = AtomicUsize::new(0);
static BITMAP: Mutex<Option<BitmapState>> = Mutex::new(None);

/// Initializes the allocator over `[KERNEL_BOUNDARY, total_mem_bytes)`
/// using `storage` (must be at least `frame_count / 32` words, zeroed)
/// as the bitmap backing. Called once from `mm::bootloader` with memory
/// parsed from the multiboot2 tag.
pub fn init(total_mem_bytes: usize, storage: &'static mut [u32]) {
    let base_frame = KERNEL_BOUNDARY / FRAME_SIZE;
    let frame_count = (total_mem_bytes / FRAME_SIZE).saturating_sub(base_frame);
    for word in storage.iter_mut() {
        *word = 0;
    }
    FREE_FRAME_COUNT.store(frame_count, Ordering::Release);
    *BITMAP.lock() = Some(BitmapState {
        words: storage,
        base_frame,
    });
}

/// Records the permanently-zero frame's physical address. Exempt from
/// the bitmap and from every free operation.
pub fn set_zero_frame(phys_addr: usize) {
    ZERO_FRAME.store(phys_addr, Ordering::Release);
}

pub fn zero_frame_addr() -> usize {
    ZERO_FRAME.load(Ordering::Acquire)
}

pub fn free_frame_count() -> usize {
    FREE_FRAME_COUNT.load(Ordering::Acquire)
}

/// Reserves `n` frames against the global counter without allocating
/// any. Fails atomically if fewer than `n` are free, so a caller doing a
/// bulk operation (`exec`, `new_pages`) can never partially succeed.
pub fn reserve_frames(n: usize) -> KernelResult<()> {
    loop {
        let current = FREE_FRAME_COUNT.load(Ordering::Acquire);
        if current < n {
            return Err(KernelError::OutOfResource {
                requested: n,
                available: current,
            });
        }
        if FREE_FRAME_COUNT
            .compare_exchange(current, current - n, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            return Ok(());
        }
    }
}

/// Releases a previously made reservation without allocating frames for
/// it (used on rollback paths in `exec`/`new_pages`).
pub fn unreserve_frames(n: usize) {
    FREE_FRAME_COUNT.fetch_add(n, Ordering::AcqRel);
}

/// Allocates one frame out of an existing reservation. The caller must
/// have reserved at least one frame via `reserve_frames` first;
/// allocating without a matching reservation would let the free-frame
/// counter and the bitmap drift apart.
pub fn allocate_reserved_frame() -> KernelResult<usize> {
    let mut guard = BITMAP.lock();
    let state = guard.as_mut().ok_or(KernelError::IllegalState {
        reason: "frame allocator not initialized",
    })?;

    for word_idx in 0..state.words.len() {
        let word = &mut state.words[word_idx];
        if *word == u32::MAX {
            continue;
        }
        for bit in 0..BITS_PER_WORD {
            let mask = 1u32 << bit;
            if *word & mask == 0 {
                *word |= mask;
                let frame_index = word_idx * BITS_PER_WORD + bit;
                let frame = state.base_frame + frame_index;
                return Ok(frame * FRAME_SIZE);
            }
        }
    }
    Err(KernelError::OutOfResource {
        requested: 1,
        available: 0,
    })
}

/// Frees a frame previously returned by `allocate_reserved_frame` and
/// credits it back to the global counter. No-op for the zero frame.
pub fn free_frame(phys_addr: usize) {
    if phys_addr == zero_frame_addr() {
        return;
    }
    let mut guard = BITMAP.lock();
    if let Some(state) = guard.as_mut() {
        let frame = phys_addr / FRAME_SIZE;
        if frame >= state.base_frame {
            let frame_index = frame - state.base_frame;
            let word_idx = frame_index / BITS_PER_WORD;
            let bit = frame_index % BITS_PER_WORD;
            if word_idx < state.words.len() {
                state.words[word_idx] &= !(1u32 << bit);
            }
        }
    }
    drop(guard);
    FREE_FRAME_COUNT.fetch_add(1, Ordering::AcqRel);
}

/// Allocates one frame, reserving it first. Convenience wrapper for
/// callers that do not pre-reserve in bulk.
pub fn allocate_frame() -> KernelResult<usize> {
    reserve_frames(1)?;
    match allocate_reserved_frame() {
        Ok(addr) => Ok(addr),
        Err(e) => {
            unreserve_frames(1);
            Err(e)
        }
    }
}
