use std::alloc::Layout;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{BLOCK_SIZE, Block, FixedBlockPoolBuilder, Result};

/// A memory pool that serves fixed-size chunks carved out of larger blocks.
///
/// The pool is bound to a chunk [`Layout`] at creation time. Backing memory is obtained lazily
/// from the system allocator in blocks of a fixed size, each of which is carved into as many
/// whole chunks as fit; the chunk addresses are kept on a free-address stack from which
/// [`allocate()`](Self::allocate) pops and onto which [`deallocate()`](Self::deallocate) pushes.
/// Both operations complete in O(1) amortized time, independent of how much the pool has grown.
///
/// # Key characteristics
///
/// - **Fixed chunk size**: every allocation returns exactly one chunk of the bound layout
/// - **Lazy growth**: no memory is reserved until the first allocation; a new block is obtained
///   whenever the free-address stack runs dry
/// - **No mid-life shrinking**: blocks are released only when the pool itself is dropped
/// - **Unchecked reclamation**: [`deallocate()`](Self::deallocate) performs no ownership or
///   double-free checks in release builds; the preconditions are the caller's obligation
/// - **Rebinding**: the chunk layout may be changed via [`rebind()`](Self::rebind), but only
///   while the pool has never served an allocation
///
/// # Example
///
/// ```rust
/// use fixed_block_pool::FixedBlockPool;
///
/// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
///
/// let addr = pool.allocate()?;
///
/// // The chunk is raw memory; writing a value into it is the caller's business.
/// // SAFETY: The address points to a chunk of u64 size and alignment that we own exclusively.
/// unsafe {
///     addr.cast::<u64>().write(42);
///     assert_eq!(addr.cast::<u64>().read(), 42);
/// }
///
/// // SAFETY: The address was returned by this pool and has not been deallocated since.
/// unsafe {
///     pool.deallocate(addr);
/// }
/// # Ok::<(), fixed_block_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) and can be moved between threads, but it is not
/// thread-safe ([`Sync`]): it performs no locking around the free-address stack or the block
/// registry. Callers requiring concurrent access must wrap the pool with external
/// synchronization or keep one pool instance per thread.
#[derive(Debug)]
pub struct FixedBlockPool {
    /// The memory layout of the chunks this pool serves. Fixed for the lifetime of the pool
    /// except via rebind(), which is only permitted before the first allocation.
    chunk_layout: Layout,

    /// Distance in bytes between consecutive chunk base addresses within a block. This is the
    /// chunk size padded to the chunk alignment, so every carved address satisfies the layout.
    chunk_stride: NonZero<usize>,

    /// LIFO stack of chunk addresses currently available for allocation. Every address points
    /// inside some block in the registry, at a stride-multiple offset, and appears at most once.
    free_addrs: Vec<NonNull<u8>>,

    /// The blocks owned by this pool. The registry only ever grows; each block is released
    /// exactly once, when the pool is dropped.
    blocks: Vec<Block>,
}

impl FixedBlockPool {
    /// Creates a builder for configuring and constructing a [`FixedBlockPool`].
    ///
    /// This is how you create a [`FixedBlockPool`]. You must specify a chunk layout using
    /// `.layout()`, `.layout_of::<T>()` or `.chunk_size()` before calling `.build()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::alloc::Layout;
    ///
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// // Create a pool serving u64-shaped chunks using an explicit layout.
    /// let layout = Layout::new::<u64>();
    /// let pool = FixedBlockPool::builder().layout(layout).build();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert!(pool.is_empty());
    /// assert_eq!(pool.chunk_layout(), layout);
    ///
    /// // Create a pool for u32-shaped chunks using type-based layout.
    /// let pool = FixedBlockPool::builder().layout_of::<u32>().build();
    /// ```
    #[inline]
    pub fn builder() -> FixedBlockPoolBuilder {
        FixedBlockPoolBuilder::new()
    }

    /// Creates a new [`FixedBlockPool`] with the specified chunk layout.
    ///
    /// This method is used internally by the builder to construct the actual pool.
    ///
    /// # Panics
    ///
    /// Panics if the layout has zero size or if a chunk padded to its alignment would not fit
    /// in one block.
    #[must_use]
    pub(crate) fn new_inner(chunk_layout: Layout) -> Self {
        let chunk_stride = Self::validated_stride(chunk_layout);

        Self {
            chunk_layout,
            chunk_stride,
            free_addrs: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Computes the carve stride for a chunk layout, enforcing the pool's sizing rules.
    ///
    /// # Panics
    ///
    /// Panics if the layout has zero size or if the stride would exceed the block size.
    /// An oversized chunk can never be carved from a block, so allowing it through would
    /// make the pool grow forever without ever producing a usable chunk.
    fn validated_stride(chunk_layout: Layout) -> NonZero<usize> {
        let stride = NonZero::new(chunk_layout.pad_to_align().size()).expect(
            "FixedBlockPool must have non-zero chunk size",
        );

        assert!(
            stride.get() <= BLOCK_SIZE.get(),
            "chunk layout {chunk_layout:?} padded to {stride} bytes does not fit in a {BLOCK_SIZE}-byte block"
        );

        stride
    }

    /// Returns the memory layout of the chunks this pool serves.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::alloc::Layout;
    ///
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let layout = Layout::new::<u128>();
    /// let pool = FixedBlockPool::builder().layout(layout).build();
    ///
    /// assert_eq!(pool.chunk_layout(), layout);
    /// assert_eq!(pool.chunk_layout().size(), size_of::<u128>());
    /// ```
    #[must_use]
    #[inline]
    pub fn chunk_layout(&self) -> Layout {
        self.chunk_layout
    }

    /// The number of chunks currently outstanding (allocated but not yet deallocated).
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// assert_eq!(pool.len(), 0);
    ///
    /// let first = pool.allocate()?;
    /// assert_eq!(pool.len(), 1);
    ///
    /// let second = pool.allocate()?;
    /// assert_eq!(pool.len(), 2);
    ///
    /// // SAFETY: The address was returned by this pool and has not been deallocated since.
    /// unsafe {
    ///     pool.deallocate(first);
    /// }
    /// assert_eq!(pool.len(), 1);
    /// # _ = second;
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    #[inline]
    pub fn len(&self) -> usize {
        // Cannot underflow because every free address was carved from some block in the registry.
        self.capacity().wrapping_sub(self.free_addrs.len())
    }

    /// Whether the pool has no outstanding chunks.
    ///
    /// An empty pool may still be holding backing memory from earlier allocations.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// assert!(pool.is_empty());
    ///
    /// let addr = pool.allocate()?;
    /// assert!(!pool.is_empty());
    ///
    /// // SAFETY: The address was returned by this pool and has not been deallocated since.
    /// unsafe {
    ///     pool.deallocate(addr);
    /// }
    /// assert!(pool.is_empty());
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of chunks the pool can serve without obtaining another block.
    ///
    /// This is the total number of chunks carved across all blocks, including chunks that are
    /// currently outstanding. Capacity grows automatically when [`allocate()`](Self::allocate)
    /// finds the free-address stack empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// // A new pool starts with zero capacity.
    /// assert_eq!(pool.capacity(), 0);
    ///
    /// // The first allocation carves a whole block into chunks.
    /// let addr = pool.allocate()?;
    /// assert!(pool.capacity() > 0);
    /// # _ = addr;
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        // Overflow here would imply capacity is greater than virtual memory - impossible.
        self.blocks.len().wrapping_mul(self.chunks_per_block())
    }

    /// The number of blocks currently in the registry.
    ///
    /// The registry only ever grows; blocks are released to the system allocator when the pool
    /// is dropped, never earlier.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// assert_eq!(pool.block_count(), 0);
    ///
    /// let addr = pool.allocate()?;
    /// assert_eq!(pool.block_count(), 1);
    /// # _ = addr;
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the pool has never served an allocation.
    ///
    /// Only an unused pool may be [rebound](Self::rebind) to a different chunk layout. Because
    /// blocks are never released before the pool is dropped, a pool that has allocated even
    /// once - regardless of subsequent deallocations - is no longer unused.
    #[must_use]
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.free_addrs.is_empty() && self.blocks.is_empty()
    }

    /// How many whole chunks fit in one block at the current chunk stride.
    #[expect(
        clippy::integer_division,
        reason = "the remainder is intentionally discarded as unused padding"
    )]
    fn chunks_per_block(&self) -> usize {
        BLOCK_SIZE.get() / self.chunk_stride.get()
    }

    /// Pops one chunk address off the free-address stack, growing the pool by one block first
    /// if the stack is empty.
    ///
    /// The returned address references exactly one chunk of the bound layout's size, aligned to
    /// the layout's alignment. The chunk contents are uninitialized.
    ///
    /// Surfaces an [`Error::BlockAllocationFailed`][crate::Error::BlockAllocationFailed] if the
    /// pool needs a new block and the system allocator cannot supply one. The pool never returns
    /// a null or dangling address.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// let addr = pool.allocate()?;
    ///
    /// // SAFETY: The chunk has u64 size and alignment and we own it exclusively.
    /// unsafe {
    ///     addr.cast::<u64>().write(1234);
    /// }
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[inline]
    pub fn allocate(&mut self) -> Result<NonNull<u8>> {
        if self.free_addrs.is_empty() {
            self.grow()?;
        }

        Ok(self
            .free_addrs
            .pop()
            .expect("grow() pushed at least one chunk address onto the free-address stack"))
    }

    /// Pushes a chunk address back onto the free-address stack, making it available for reuse.
    ///
    /// This never releases backing memory; the chunk's block stays in the registry until the
    /// pool is dropped.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// let addr = pool.allocate()?;
    ///
    /// // SAFETY: The address was returned by this pool and has not been deallocated since.
    /// unsafe {
    ///     pool.deallocate(addr);
    /// }
    ///
    /// // The chunk is immediately available again.
    /// let again = pool.allocate()?;
    /// assert_eq!(again, addr);
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `addr` was returned by [`allocate()`](Self::allocate) on this same pool instance.
    /// - `addr` has not already been deallocated since that allocation.
    /// - No reads or writes through `addr` occur after this call until the address is returned
    ///   by a future [`allocate()`](Self::allocate).
    ///
    /// No check is performed in release builds - passing a foreign or already-freed address is
    /// undefined behavior. In debug builds, these preconditions are validated with assertions.
    #[inline]
    pub unsafe fn deallocate(&mut self, addr: NonNull<u8>) {
        #[cfg(debug_assertions)]
        self.debug_validate_reclaimed_addr(addr);

        self.free_addrs.push(addr);
    }

    /// Changes the chunk layout of a pool that has never served an allocation.
    ///
    /// Rebinding exists so that one pool can be retargeted when the client that owns it is
    /// converted to manage a different chunk type, as generic containers do with their
    /// allocators. It is a configuration operation, not a reallocation: no memory exists yet
    /// at the moment a rebind is legal.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::alloc::Layout;
    ///
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u32>().build();
    ///
    /// // No allocation has happened, so the pool may be retargeted.
    /// pool.rebind(Layout::new::<u64>());
    /// assert_eq!(pool.chunk_layout(), Layout::new::<u64>());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool has ever served an allocation (see [`is_unused()`](Self::is_unused)).
    /// Continuing with inconsistent chunk sizing would corrupt the carve bookkeeping, so this
    /// is a fatal usage error rather than a recoverable failure.
    ///
    /// Also panics if the new layout has zero size or does not fit in one block, exactly as at
    /// construction time.
    pub fn rebind(&mut self, new_chunk_layout: Layout) {
        assert!(
            self.is_unused(),
            "rebind is only valid on a pool that has never served an allocation (outstanding: {}, blocks: {})",
            self.len(),
            self.blocks.len()
        );

        self.chunk_stride = Self::validated_stride(new_chunk_layout);
        self.chunk_layout = new_chunk_layout;
    }

    /// Grows the pool until at least `additional` chunks are available without obtaining
    /// another block.
    ///
    /// Surfaces an [`Error::BlockAllocationFailed`][crate::Error::BlockAllocationFailed] if the
    /// system allocator cannot supply a needed block; blocks obtained before the failure are
    /// retained.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
    ///
    /// pool.reserve(10)?;
    /// assert!(pool.capacity() >= 10);
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use and/or infinite loop.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        while self.free_addrs.len() < additional {
            self.grow()?;
        }

        Ok(())
    }

    /// Obtains one new block from the system allocator, carves it into chunks and pushes every
    /// chunk address onto the free-address stack.
    fn grow(&mut self) -> Result<()> {
        let block = Block::new(self.chunk_stride, self.chunk_layout.align())?;

        self.free_addrs.reserve(block.chunk_count());
        self.free_addrs.extend(block.chunk_addrs());
        self.blocks.push(block);

        Ok(())
    }

    /// Validates the deallocation preconditions that release builds deliberately skip.
    ///
    /// The linear scans here are acceptable only because this runs in debug builds; the
    /// release-build contract remains unchecked by design.
    #[cfg(debug_assertions)]
    fn debug_validate_reclaimed_addr(&self, addr: NonNull<u8>) {
        assert!(
            self.blocks.iter().any(|block| block.owns_chunk(addr)),
            "deallocate() was passed an address that no block of this pool carved into a chunk"
        );

        assert!(
            !self.free_addrs.contains(&addr),
            "deallocate() was passed an address that is already on the free-address stack"
        );
    }

    /// Performs an integrity check on the pool data structure.
    ///
    /// This method is only available in debug builds and is used for testing and validation.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    #[cfg_attr(not(test), expect(dead_code, reason = "exercised by the test suite"))]
    pub(crate) fn integrity_check(&self) {
        use std::collections::HashSet;

        assert!(
            self.free_addrs.len() <= self.capacity(),
            "free-address stack holds {} addresses but only {} chunks were ever carved",
            self.free_addrs.len(),
            self.capacity()
        );

        let mut seen = HashSet::new();

        for addr in &self.free_addrs {
            assert!(
                seen.insert(addr.addr()),
                "free-address stack holds a duplicate address"
            );

            assert!(
                self.blocks.iter().any(|block| block.owns_chunk(*addr)),
                "free-address stack holds an address that no block carved into a chunk"
            );
        }
    }
}

// SAFETY: FixedBlockPool contains raw chunk addresses but they all point into blocks the pool
// exclusively owns. Moving the pool to another thread moves ownership of every block with it.
// All mutation happens through &mut self, so no synchronization is required for Send.
unsafe impl Send for FixedBlockPool {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    clippy::items_after_statements,
    clippy::modulo_arithmetic,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::collections::HashSet;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    // The pool is thread-mobile but performs no internal locking.
    assert_impl_all!(FixedBlockPool: Send, std::fmt::Debug);
    assert_not_impl_any!(FixedBlockPool: Sync);

    fn pool_with_chunk_size(chunk_size: usize) -> FixedBlockPool {
        FixedBlockPool::builder().chunk_size(chunk_size).build()
    }

    #[test]
    fn smoke_test() {
        let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 0);

        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let c = pool.allocate().unwrap();

        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());

        unsafe {
            a.cast::<u64>().write(42);
            b.cast::<u64>().write(43);
            c.cast::<u64>().write(44);

            assert_eq!(a.cast::<u64>().read(), 42);
            assert_eq!(b.cast::<u64>().read(), 43);
            assert_eq!(c.cast::<u64>().read(), 44);
        }

        unsafe {
            pool.deallocate(b);
        }
        assert_eq!(pool.len(), 2);

        // The freed chunk is reused before anything else.
        let d = pool.allocate().unwrap();
        assert_eq!(d, b);

        unsafe {
            pool.deallocate(a);
            pool.deallocate(c);
            pool.deallocate(d);
        }
        assert!(pool.is_empty());

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn outstanding_addresses_are_never_duplicated() {
        let mut pool = pool_with_chunk_size(64);

        let mut outstanding = HashSet::new();

        // Allocate across a block boundary, interleaving some deallocations.
        for round in 0..200_usize {
            let addr = pool.allocate().unwrap();
            assert!(
                outstanding.insert(addr),
                "allocate() returned an address that is already outstanding"
            );

            if round % 3 == 0 {
                let victim = *outstanding.iter().next().unwrap();
                outstanding.remove(&victim);
                unsafe {
                    pool.deallocate(victim);
                }
            }
        }

        #[cfg(debug_assertions)]
        pool.integrity_check();
    }

    #[test]
    fn deallocate_then_allocate_round_trips() {
        let mut pool = pool_with_chunk_size(64);

        // Establish a baseline with one chunk in flight.
        let baseline = pool.allocate().unwrap();
        let len_before = pool.len();
        let capacity_before = pool.capacity();

        let addr = pool.allocate().unwrap();
        unsafe {
            pool.deallocate(addr);
        }

        assert_eq!(pool.len(), len_before);
        assert_eq!(pool.capacity(), capacity_before);

        // LIFO reuse means the very same chunk comes back.
        let again = pool.allocate().unwrap();
        assert_eq!(again, addr);

        _ = baseline;
    }

    #[test]
    fn grows_by_one_block_exactly_when_exhausted() {
        // 4096 / 64 = 64 chunks per block.
        let mut pool = pool_with_chunk_size(64);

        for _ in 0..64 {
            _ = pool.allocate().unwrap();
        }

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.capacity(), 64);

        // The 65th allocation must trigger the second block.
        _ = pool.allocate().unwrap();

        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.capacity(), 128);
    }

    #[test]
    fn returned_addresses_satisfy_chunk_alignment() {
        let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();

        for _ in 0..100 {
            let addr = pool.allocate().unwrap();
            assert_eq!(addr.addr().get() % align_of::<u64>(), 0);
        }

        #[repr(C, align(16))]
        struct OWord {
            data: [u64; 2],
        }

        let mut pool = FixedBlockPool::builder().layout_of::<OWord>().build();

        for _ in 0..100 {
            let addr = pool.allocate().unwrap();
            assert_eq!(addr.addr().get() % 16, 0);
        }
    }

    #[test]
    fn custom_layout_alignment_is_honored() {
        // A 16-byte chunk for a type requiring 8-byte alignment.
        let layout = Layout::from_size_align(16, 8).unwrap();
        let mut pool = FixedBlockPool::builder().layout(layout).build();

        for _ in 0..300 {
            let addr = pool.allocate().unwrap();
            assert_eq!(addr.addr().get() % 8, 0);
        }
    }

    #[test]
    fn fragmentation_is_bounded_by_block_remainder() {
        // 4096 / 100 = 40 chunks per block; 96 bytes of padding per block.
        let mut pool = pool_with_chunk_size(100);

        _ = pool.allocate().unwrap();

        assert_eq!(pool.capacity(), 40);

        let carved_bytes = pool.capacity() * 100;
        assert_eq!(4096 - carved_bytes, 4096 % 100);
    }

    #[test]
    fn freed_chunks_are_reused_before_growing() {
        let mut pool = pool_with_chunk_size(64);

        let count = 100_usize;
        let addrs: Vec<_> = (0..count).map(|_| pool.allocate().unwrap()).collect();

        let blocks_after_fill = pool.block_count();

        // Free in a scrambled order: 37 is coprime with 100, so this visits every index once.
        for step in 0..count {
            let index = (step * 37) % count;
            unsafe {
                pool.deallocate(addrs[index]);
            }
        }

        assert!(pool.is_empty());

        // Reallocating the same count must be fully served from the freed chunks.
        let reused: HashSet<_> = (0..count).map(|_| pool.allocate().unwrap()).collect();

        assert_eq!(reused.len(), count);
        assert_eq!(pool.block_count(), blocks_after_fill);
    }

    #[test]
    fn rebind_before_first_allocation_works() {
        let mut pool = FixedBlockPool::builder().layout_of::<u32>().build();

        pool.rebind(Layout::new::<[u8; 256]>());
        assert_eq!(pool.chunk_layout(), Layout::new::<[u8; 256]>());

        // The new geometry governs the first carve: 4096 / 256 = 16 chunks.
        _ = pool.allocate().unwrap();
        assert_eq!(pool.capacity(), 16);
    }

    #[test]
    #[should_panic]
    fn rebind_after_allocation_panics() {
        let mut pool = FixedBlockPool::builder().layout_of::<u32>().build();

        let addr = pool.allocate().unwrap();

        // Even a fully deallocated pool stays bound: the blocks remain in the registry.
        unsafe {
            pool.deallocate(addr);
        }

        pool.rebind(Layout::new::<u64>());
    }

    #[test]
    #[should_panic]
    fn oversized_chunk_rebind_panics() {
        let mut pool = FixedBlockPool::builder().layout_of::<u32>().build();

        pool.rebind(Layout::new::<[u8; 8192]>());
    }

    #[test]
    fn reserve_provides_capacity_up_front() {
        let mut pool = pool_with_chunk_size(64);

        pool.reserve(100).unwrap();

        // 100 chunks need two 64-chunk blocks.
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.capacity(), 128);

        // Allocating within the reserved capacity creates no further blocks.
        for _ in 0..100 {
            _ = pool.allocate().unwrap();
        }
        assert_eq!(pool.block_count(), 2);
    }

    #[test]
    fn is_unused_reflects_first_allocation() {
        let mut pool = pool_with_chunk_size(64);
        assert!(pool.is_unused());

        let addr = pool.allocate().unwrap();
        assert!(!pool.is_unused());

        unsafe {
            pool.deallocate(addr);
        }
        assert!(!pool.is_unused());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn debug_build_detects_double_free() {
        let mut pool = pool_with_chunk_size(64);

        let addr = pool.allocate().unwrap();

        unsafe {
            pool.deallocate(addr);
            pool.deallocate(addr);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn debug_build_detects_foreign_address() {
        let mut pool = pool_with_chunk_size(64);
        let mut other = pool_with_chunk_size(64);

        _ = pool.allocate().unwrap();
        let foreign = other.allocate().unwrap();

        unsafe {
            pool.deallocate(foreign);
        }
    }

    #[test]
    fn pool_is_send() {
        let mut pool = pool_with_chunk_size(64);
        let addr = pool.allocate().unwrap();
        unsafe {
            pool.deallocate(addr);
        }

        // Verify the pool, including its live block, can move to another thread.
        let handle = std::thread::spawn(move || {
            let mut pool = pool;
            pool.allocate().unwrap();
            pool.len()
        });

        assert_eq!(handle.join().unwrap(), 1);
    }
}
