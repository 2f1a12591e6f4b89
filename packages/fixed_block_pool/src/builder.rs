use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;

use crate::FixedBlockPool;

/// Builder for creating an instance of [`FixedBlockPool`].
///
/// [`FixedBlockPool`] requires the chunk layout to be specified at construction time. Use
/// `.layout()` to provide a specific layout, `.layout_of::<T>()` to generate a layout based on
/// the provided type, or `.chunk_size()` for a size-only binding with byte alignment.
///
/// The chunk layout is mandatory; there are no optional settings today.
///
/// # Examples
///
/// Using a specific layout:
///
/// ```
/// use std::alloc::Layout;
///
/// use fixed_block_pool::FixedBlockPool;
///
/// let layout = Layout::new::<u32>();
/// let pool = FixedBlockPool::builder().layout(layout).build();
/// ```
///
/// Using type-based layout:
///
/// ```
/// use fixed_block_pool::FixedBlockPool;
///
/// let pool = FixedBlockPool::builder().layout_of::<u64>().build();
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing pool configuration to happen on different threads than where the pool is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct FixedBlockPoolBuilder {
    chunk_layout: Option<Layout>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl FixedBlockPoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            chunk_layout: None,
            _not_sync: PhantomData,
        }
    }

    /// Sets the memory layout of the chunks the pool will serve.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let layout = Layout::new::<u32>();
    /// let pool = FixedBlockPool::builder().layout(layout).build();
    /// ```
    #[inline]
    pub fn layout(mut self, layout: Layout) -> Self {
        assert!(
            layout.size() > 0,
            "FixedBlockPool must have non-zero chunk size"
        );
        self.chunk_layout = Some(layout);
        self
    }

    /// Sets the memory layout of the chunks the pool will serve based on a type.
    ///
    /// This is a convenience method that automatically creates the layout for the given type.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let pool = FixedBlockPool::builder().layout_of::<u64>().build();
    /// ```
    #[inline]
    pub fn layout_of<T>(mut self) -> Self {
        let layout = Layout::new::<T>();
        assert!(
            layout.size() > 0,
            "FixedBlockPool must have non-zero chunk size"
        );
        self.chunk_layout = Some(layout);
        self
    }

    /// Sets the chunk size in bytes, with no alignment requirement beyond byte alignment.
    ///
    /// Use [`layout()`](Self::layout) or [`layout_of()`](Self::layout_of) instead when the
    /// chunks will hold a type with an alignment requirement.
    ///
    /// # Examples
    ///
    /// ```
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let pool = FixedBlockPool::builder().chunk_size(100).build();
    ///
    /// assert_eq!(pool.chunk_layout().size(), 100);
    /// ```
    #[inline]
    pub fn chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "FixedBlockPool must have non-zero chunk size");

        let layout = Layout::from_size_align(size, 1)
            .expect("a non-zero size with byte alignment forms a valid layout");
        self.chunk_layout = Some(layout);
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no chunk layout has been set using [`layout`](Self::layout),
    /// [`layout_of`](Self::layout_of) or [`chunk_size`](Self::chunk_size), or if a chunk
    /// padded to its alignment would not fit in one of the pool's blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use fixed_block_pool::FixedBlockPool;
    ///
    /// let layout = Layout::new::<u32>();
    /// let pool = FixedBlockPool::builder().layout(layout).build();
    /// ```
    #[must_use]
    #[inline]
    pub fn build(self) -> FixedBlockPool {
        let layout = self.chunk_layout.expect(
            "chunk layout must be set using .layout(), .layout_of::<T>() or .chunk_size() before calling .build()",
        );
        FixedBlockPool::new_inner(layout)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::alloc::Layout;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    // Test trait implementations.
    assert_impl_all!(FixedBlockPoolBuilder: Send, std::fmt::Debug);
    assert_not_impl_any!(FixedBlockPoolBuilder: Sync);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = FixedBlockPoolBuilder::new();
        assert!(builder.chunk_layout.is_none());
    }

    #[test]
    fn layout_sets_layout_correctly() {
        let layout = Layout::new::<u64>();
        let builder = FixedBlockPoolBuilder::new().layout(layout);
        assert_eq!(builder.chunk_layout, Some(layout));
    }

    #[test]
    fn layout_of_sets_layout_correctly() {
        let builder = FixedBlockPoolBuilder::new().layout_of::<String>();
        assert_eq!(builder.chunk_layout, Some(Layout::new::<String>()));
    }

    #[test]
    fn chunk_size_sets_byte_aligned_layout() {
        let builder = FixedBlockPoolBuilder::new().chunk_size(100);
        let layout = builder.chunk_layout.unwrap();

        assert_eq!(layout.size(), 100);
        assert_eq!(layout.align(), 1);
    }

    #[test]
    #[should_panic]
    fn layout_with_zero_size_panics() {
        let layout = Layout::new::<()>();
        _ = FixedBlockPoolBuilder::new().layout(layout);
    }

    #[test]
    #[should_panic]
    fn layout_of_zero_sized_type_panics() {
        _ = FixedBlockPoolBuilder::new().layout_of::<()>();
    }

    #[test]
    #[should_panic]
    fn chunk_size_zero_panics() {
        _ = FixedBlockPoolBuilder::new().chunk_size(0);
    }

    #[test]
    #[should_panic]
    fn build_without_layout_panics() {
        _ = FixedBlockPoolBuilder::new().build();
    }

    #[test]
    #[should_panic]
    fn oversized_chunk_panics_at_build() {
        // A chunk that can never be carved from a block must be rejected up front;
        // otherwise the pool would grow forever without producing a single chunk.
        _ = FixedBlockPoolBuilder::new().chunk_size(8192).build();
    }

    #[test]
    fn chunk_exactly_block_sized_is_accepted() {
        let pool = FixedBlockPoolBuilder::new().chunk_size(4096).build();
        assert_eq!(pool.chunk_layout().size(), 4096);
    }

    #[test]
    fn layout_can_be_overridden() {
        let layout1 = Layout::new::<u32>();
        let layout2 = Layout::new::<u64>();

        let builder = FixedBlockPoolBuilder::new().layout(layout1).layout(layout2);
        assert_eq!(builder.chunk_layout, Some(layout2));
    }

    #[test]
    fn entry_points_can_be_mixed() {
        let manual_layout = Layout::new::<String>();
        let builder = FixedBlockPoolBuilder::new()
            .layout_of::<u64>()
            .layout(manual_layout);
        assert_eq!(builder.chunk_layout, Some(manual_layout));

        let builder = FixedBlockPoolBuilder::new()
            .layout(manual_layout)
            .chunk_size(32);
        assert_eq!(builder.chunk_layout.unwrap().size(), 32);
    }

    #[test]
    fn build_with_layout_succeeds() {
        let layout = Layout::new::<u32>();
        let pool = FixedBlockPoolBuilder::new().layout(layout).build();
        assert_eq!(pool.chunk_layout(), layout);
    }

    #[test]
    fn builder_send_trait() {
        // Verify builder can be moved between threads.
        let builder = FixedBlockPoolBuilder::new().layout_of::<u64>();
        let handle = std::thread::spawn(move || builder.build());
        let _pool = handle.join().expect("thread completed successfully");
    }
}
