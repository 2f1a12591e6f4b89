use std::alloc::{Layout, alloc, dealloc};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::{Error, FixedBlockPool, Result};

/// A typed allocation handle over a shared [`FixedBlockPool`].
///
/// `PoolAllocator<T>` is the adapter a container-like client would hold: it binds a pool to the
/// layout of `T` and serves single-element requests from it, while sending any bulk request
/// straight to the system allocator (the pool's fast path only exists for one chunk at a time).
///
/// Cloning the handle shares the underlying pool rather than duplicating it, so clients that
/// copy their allocator keep drawing from one pool. Two handles compare equal exactly when they
/// reference the same pool instance, which is the property container machinery relies on to
/// decide whether memory allocated through one handle may be released through another.
///
/// # Example
///
/// ```rust
/// use fixed_block_pool::PoolAllocator;
///
/// let allocator = PoolAllocator::<u64>::new();
///
/// let chunk = allocator.allocate(1)?;
///
/// // SAFETY: The chunk has u64 size and alignment and we own it exclusively.
/// unsafe {
///     chunk.write(42);
///     assert_eq!(chunk.read(), 42);
/// }
///
/// // SAFETY: The chunk came from this allocator with count 1 and is returned once.
/// unsafe {
///     allocator.deallocate(chunk, 1);
/// }
/// # Ok::<(), fixed_block_pool::Error>(())
/// ```
///
/// # Thread safety
///
/// The handle is single-threaded: sharing is reference-counted without atomics, so the handle
/// is neither [`Send`] nor [`Sync`], matching the pool's own single-threaded design.
pub struct PoolAllocator<T> {
    /// The pool every clone of this handle draws from. Shared ownership keeps the pool alive
    /// for as long as the longest-lived handle.
    pool: Rc<RefCell<FixedBlockPool>>,

    _chunk_type: PhantomData<T>,
}

impl<T> PoolAllocator<T> {
    /// Creates a handle over a fresh pool bound to the layout of `T`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::PoolAllocator;
    ///
    /// let allocator = PoolAllocator::<u128>::new();
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized; the pool cannot carve zero-size chunks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: Rc::new(RefCell::new(
                FixedBlockPool::builder().layout_of::<T>().build(),
            )),
            _chunk_type: PhantomData,
        }
    }

    /// Converts this handle into one serving a different chunk type, sharing the same pool.
    ///
    /// This is the rebinding conversion generic containers perform when they retarget an
    /// allocator from the element type to an internal node type. The shared pool is rebound
    /// to the layout of `U`, which is only valid while the pool has never served an
    /// allocation; after the conversion, single-chunk requests should go through the returned
    /// handle, since the pool now carves `U`-shaped chunks.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::PoolAllocator;
    ///
    /// struct Node {
    ///     value: u32,
    ///     next: Option<std::ptr::NonNull<Node>>,
    /// }
    ///
    /// let for_values = PoolAllocator::<u32>::new();
    /// let for_nodes = for_values.cast::<Node>();
    ///
    /// // Both handles reference the one pool.
    /// assert_eq!(for_values, for_nodes);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pool has already served an allocation (see
    /// [`FixedBlockPool::rebind()`]) or if `U` is zero-sized.
    #[must_use]
    pub fn cast<U>(&self) -> PoolAllocator<U> {
        self.pool.borrow_mut().rebind(Layout::new::<U>());

        PoolAllocator {
            pool: Rc::clone(&self.pool),
            _chunk_type: PhantomData,
        }
    }

    /// Allocates memory for `count` values of `T`.
    ///
    /// A single-element request is served from the pool in O(1) amortized time. Any other
    /// count bypasses the pool entirely and goes to the system allocator, because the pool
    /// only carves chunks of one fixed size.
    ///
    /// The returned memory is uninitialized.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fixed_block_pool::PoolAllocator;
    ///
    /// let allocator = PoolAllocator::<u32>::new();
    ///
    /// // Served from the pool.
    /// let single = allocator.allocate(1)?;
    ///
    /// // Served by the system allocator.
    /// let bulk = allocator.allocate(16)?;
    ///
    /// // SAFETY: Both pointers came from this allocator with the counts given here.
    /// unsafe {
    ///     allocator.deallocate(single, 1);
    ///     allocator.deallocate(bulk, 16);
    /// }
    /// # Ok::<(), fixed_block_pool::Error>(())
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero or if the total bulk size overflows.
    pub fn allocate(&self, count: usize) -> Result<NonNull<T>> {
        assert!(count > 0, "cannot allocate zero values");

        if count == 1 {
            return Ok(self.pool.borrow_mut().allocate()?.cast::<T>());
        }

        let layout = Layout::array::<T>(count)
            .expect("requested bulk allocation exceeds the size of virtual memory");

        // SAFETY: The layout has non-zero size because count > 0 and the pool rejects
        // zero-sized chunk types at construction.
        NonNull::new(unsafe { alloc(layout) })
            .map(NonNull::cast::<T>)
            .ok_or_else(|| Error::BulkAllocationFailed {
                size: layout.size(),
            })
    }

    /// Releases memory previously obtained from [`allocate()`](Self::allocate).
    ///
    /// A single-element chunk returns to the pool for reuse; bulk memory goes back to the
    /// system allocator.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `ptr` was returned by [`allocate()`](Self::allocate) on this handle or one sharing
    ///   its pool, with the same `count`.
    /// - `ptr` has not already been deallocated since that allocation.
    /// - No reads or writes through `ptr` occur after this call.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        assert!(count > 0, "cannot deallocate zero values");

        if count == 1 {
            // SAFETY: The caller guarantees the address came from this pool with count 1
            // and has not been freed since.
            unsafe {
                self.pool.borrow_mut().deallocate(ptr.cast::<u8>());
            }
            return;
        }

        let layout = Layout::array::<T>(count)
            .expect("a layout that was allocated cannot fail to compute again");

        // SAFETY: The caller guarantees ptr came from the system allocator via allocate()
        // with this same count, so the layout matches the original allocation.
        unsafe {
            dealloc(ptr.as_ptr().cast::<u8>(), layout);
        }
    }
}

impl<T> Default for PoolAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PoolAllocator<T> {
    /// Clones the handle, sharing the same underlying pool.
    fn clone(&self) -> Self {
        Self {
            pool: Rc::clone(&self.pool),
            _chunk_type: PhantomData,
        }
    }
}

/// Two handles are equal exactly when they reference the same pool instance, regardless of
/// the chunk types they are typed with.
impl<T, U> PartialEq<PoolAllocator<U>> for PoolAllocator<T> {
    fn eq(&self, other: &PoolAllocator<U>) -> bool {
        Rc::ptr_eq(&self.pool, &other.pool)
    }
}

impl<T> Eq for PoolAllocator<T> {}

impl<T> fmt::Debug for PoolAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    // Sharing is Rc-based, so the handle must stay on one thread.
    assert_not_impl_any!(PoolAllocator<u64>: Send, Sync);

    #[test]
    fn clones_share_one_pool() {
        let a = PoolAllocator::<u64>::new();
        let b = a.clone();

        let chunk = a.allocate(1).unwrap();

        // Returning through the clone and reallocating through the original yields the
        // same chunk - there is only one free-address stack underneath.
        unsafe {
            b.deallocate(chunk, 1);
        }
        let again = a.allocate(1).unwrap();

        assert_eq!(again, chunk);
    }

    #[test]
    fn equality_is_pool_identity() {
        let a = PoolAllocator::<u64>::new();
        let b = a.clone();
        let unrelated = PoolAllocator::<u64>::new();

        assert_eq!(a, b);
        assert_ne!(a, unrelated);
    }

    #[test]
    fn equality_spans_chunk_types() {
        let values = PoolAllocator::<u32>::new();
        let nodes = values.cast::<[u32; 4]>();

        assert_eq!(values, nodes);
        assert_eq!(nodes, values);
    }

    #[test]
    fn cast_rebinds_the_shared_pool() {
        let values = PoolAllocator::<u32>::new();
        let nodes = values.cast::<[u64; 8]>();

        assert_eq!(
            nodes.pool.borrow().chunk_layout(),
            Layout::new::<[u64; 8]>()
        );
    }

    #[test]
    #[should_panic]
    fn cast_after_allocation_panics() {
        let values = PoolAllocator::<u32>::new();

        let chunk = values.allocate(1).unwrap();
        unsafe {
            values.deallocate(chunk, 1);
        }

        _ = values.cast::<u64>();
    }

    #[test]
    fn bulk_requests_bypass_the_pool() {
        let allocator = PoolAllocator::<u64>::new();

        let bulk = allocator.allocate(32).unwrap();

        // The pool saw nothing: no block was created for the bulk request.
        assert_eq!(allocator.pool.borrow().block_count(), 0);

        unsafe {
            allocator.deallocate(bulk, 32);
        }
    }

    #[test]
    fn bulk_memory_is_usable() {
        let allocator = PoolAllocator::<u32>::new();

        let bulk = allocator.allocate(16).unwrap();

        unsafe {
            for offset in 0..16 {
                bulk.add(offset).write(u32::try_from(offset).unwrap());
            }

            for offset in 0..16 {
                assert_eq!(bulk.add(offset).read(), u32::try_from(offset).unwrap());
            }

            allocator.deallocate(bulk, 16);
        }
    }

    #[test]
    #[should_panic]
    fn zero_count_allocation_panics() {
        let allocator = PoolAllocator::<u64>::new();
        _ = allocator.allocate(0);
    }

    #[test]
    fn default_is_a_fresh_pool() {
        let a = PoolAllocator::<u64>::default();
        let b = PoolAllocator::<u64>::new();

        assert_ne!(a, b);
    }

    #[test]
    fn debug_output_names_the_type() {
        let allocator = PoolAllocator::<u64>::new();
        let output = format!("{allocator:?}");
        assert!(output.contains("PoolAllocator"));
    }
}
