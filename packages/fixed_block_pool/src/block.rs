use std::alloc::{Layout, alloc, dealloc};
use std::num::NonZero;
use std::ptr::NonNull;

use new_zealand::nz;

use crate::{Error, Result};

/// Number of bytes in each block of backing memory obtained from the system allocator.
///
/// Today, every block is the same size regardless of the chunk layout being served.
///
/// In the future, we may choose to be smarter about this, e.g. choosing the block size dynamically
/// based on the chunk layout in order to match a memory page size, or another similar criterion.
/// This is why the parameter is also not exposed in the public API - we may want to change how we
/// perform the memory layout in a future version.
pub(crate) const BLOCK_SIZE: NonZero<usize> = nz!(4096);

/// One contiguous region of raw backing memory, obtained from the system allocator and owned
/// exclusively by a pool.
///
/// A block is carved into equal-size chunks at creation time. Any trailing bytes that cannot
/// form a whole chunk are unused padding. The block is never resized; the allocation is returned
/// to the system allocator exactly once, when the block is dropped.
///
/// # Out of band access
///
/// The block does not create or keep references to its memory, so it is valid to access the
/// memory via pointers and to create custom references to it from unsafe code even when not
/// holding an exclusive reference to the block.
#[derive(Debug)]
pub(crate) struct Block {
    /// Base address of the allocation. Chunk addresses are derived from this by offsetting
    /// in stride-size steps.
    base: NonNull<u8>,

    /// Layout the allocation was made with; releasing the memory requires the identical layout.
    layout: Layout,

    /// Number of whole chunks this block was carved into.
    chunk_count: usize,

    /// Distance in bytes between consecutive chunk base addresses.
    chunk_stride: NonZero<usize>,
}

impl Block {
    /// Allocates a new block and computes its carve geometry for the given chunk stride
    /// and alignment.
    ///
    /// Surfaces an [`Error::BlockAllocationFailed`] if the system allocator cannot supply
    /// the memory.
    ///
    /// # Panics
    ///
    /// Panics if the stride exceeds the block size. The pool validates the chunk layout at
    /// construction and rebind time, so a violation here indicates a defect in the caller.
    pub(crate) fn new(chunk_stride: NonZero<usize>, chunk_align: usize) -> Result<Self> {
        assert!(
            chunk_stride.get() <= BLOCK_SIZE.get(),
            "chunk stride {chunk_stride} exceeds the block size {BLOCK_SIZE}"
        );

        let layout = Layout::from_size_align(BLOCK_SIZE.get(), chunk_align).expect(
            "the chunk alignment is a power of two no greater than the block size, which makes the block layout valid",
        );

        // SAFETY: The layout has non-zero size because BLOCK_SIZE is non-zero.
        let base = NonNull::new(unsafe { alloc(layout) }).ok_or_else(|| {
            Error::BlockAllocationFailed {
                block_size: BLOCK_SIZE.get(),
            }
        })?;

        // Any remainder that cannot fit a whole chunk is internal fragmentation.
        #[expect(
            clippy::integer_division,
            reason = "the remainder is intentionally discarded as unused padding"
        )]
        let chunk_count = BLOCK_SIZE.get() / chunk_stride.get();

        Ok(Self {
            base,
            layout,
            chunk_count,
            chunk_stride,
        })
    }

    /// Returns the number of whole chunks this block was carved into.
    #[must_use]
    pub(crate) fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Iterates the base addresses of every chunk in this block, in offset order.
    pub(crate) fn chunk_addrs(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        (0..self.chunk_count).map(|index| {
            // Cannot overflow because the carve geometry was validated against BLOCK_SIZE.
            let offset = index.wrapping_mul(self.chunk_stride.get());

            // SAFETY: index < chunk_count, so offset + stride <= BLOCK_SIZE and the
            // result stays within the allocation made in new().
            unsafe { self.base.add(offset) }
        })
    }

    /// Whether `addr` is the base address of one of this block's chunks.
    #[cfg(debug_assertions)]
    pub(crate) fn owns_chunk(&self, addr: NonNull<u8>) -> bool {
        let Some(offset) = addr.addr().get().checked_sub(self.base.addr().get()) else {
            return false;
        };

        // Cannot overflow because both factors were validated against BLOCK_SIZE.
        let carved_bytes = self.chunk_count.wrapping_mul(self.chunk_stride.get());

        #[expect(
            clippy::modulo_arithmetic,
            reason = "both operands are unsigned and the divisor is non-zero"
        )]
        let is_chunk_aligned = offset % self.chunk_stride.get() == 0;

        offset < carved_bytes && is_chunk_aligned
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: base was allocated in new() with self.layout and has not been deallocated.
        // Dropping the block is the single point where the allocation is released.
        unsafe {
            dealloc(self.base.as_ptr(), self.layout);
        }
    }
}

// SAFETY: Block contains a raw pointer but it refers exclusively to the block's own allocation.
// Moving the block to another thread moves ownership of that memory with it; there is no
// thread-local state and no sharing between blocks.
unsafe impl Send for Block {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::modulo_arithmetic,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn carves_exact_fit() {
        // 4096 / 64 leaves no remainder.
        let block = Block::new(nz!(64), 1).unwrap();

        assert_eq!(block.chunk_count(), 64);
        assert_eq!(block.chunk_addrs().count(), 64);
    }

    #[test]
    fn carves_with_remainder() {
        // 4096 / 100 = 40 whole chunks, 96 bytes of padding.
        let block = Block::new(nz!(100), 1).unwrap();

        assert_eq!(block.chunk_count(), 40);
    }

    #[test]
    fn chunk_addrs_are_unique_and_stride_spaced() {
        let block = Block::new(nz!(64), 1).unwrap();

        let addrs: Vec<_> = block.chunk_addrs().collect();
        let unique: HashSet<_> = addrs.iter().map(|addr| addr.addr()).collect();
        assert_eq!(unique.len(), addrs.len());

        for pair in addrs.windows(2) {
            let gap = pair[1].addr().get() - pair[0].addr().get();
            assert_eq!(gap, 64);
        }
    }

    #[test]
    fn chunk_addrs_respect_alignment() {
        let block = Block::new(nz!(64), 16).unwrap();

        for addr in block.chunk_addrs() {
            assert_eq!(addr.addr().get() % 16, 0);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    fn owns_chunk_accepts_only_carved_addresses() {
        let block = Block::new(nz!(100), 1).unwrap();

        for addr in block.chunk_addrs() {
            assert!(block.owns_chunk(addr));
        }

        // One byte past a chunk boundary is not a chunk address.
        let first = block.chunk_addrs().next().unwrap();
        // SAFETY: offset 1 is within the 4096-byte allocation.
        let misaligned = unsafe { first.add(1) };
        assert!(!block.owns_chunk(misaligned));

        // The padding tail is carved out of no chunk.
        // SAFETY: offset 4000 is within the 4096-byte allocation.
        let padding = unsafe { first.add(4000) };
        assert!(!block.owns_chunk(padding));
    }

    #[test]
    #[should_panic]
    fn oversized_stride_panics() {
        _ = Block::new(nz!(8192), 1);
    }
}
