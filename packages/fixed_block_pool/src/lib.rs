#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A memory pool that serves fixed-size chunks carved out of larger blocks.
//!
//! This crate provides [`FixedBlockPool`], a lazily growing pool bound to one chunk
//! [`std::alloc::Layout`] at creation time. Backing memory is obtained from the system
//! allocator in fixed-size blocks, each carved into as many whole chunks as fit; the chunk
//! addresses circulate through a free-address stack, so allocation and deallocation are both
//! O(1) amortized regardless of how large the pool has grown. The larger the block relative to
//! the chunk, the less memory is lost to per-allocation overhead - the classic pool trade-off
//! of reserving more memory up front.
//!
//! A typed adapter, [`PoolAllocator<T>`], layers container-facing semantics on top: shared
//! ownership of one pool across handle clones, identity-based handle equality, rebinding when
//! a handle is retargeted to a different chunk type, and a system-allocator fallback for bulk
//! requests that the fixed-size fast path cannot serve.
//!
//! # Key characteristics
//!
//! - **Fixed chunk size**: the pool serves exactly one chunk shape, set at creation
//! - **O(1) amortized operations**: allocation pops an address, deallocation pushes one
//! - **Lazy, grow-only memory**: blocks are obtained on demand and released only at teardown
//! - **Unchecked reclamation**: no double-free or foreign-address detection in release builds;
//!   the preconditions are documented caller obligations, validated in debug builds
//! - **Single-threaded**: no internal locking; the pool is [`Send`] but not [`Sync`]
//!
//! # Example
//!
//! ```rust
//! use fixed_block_pool::FixedBlockPool;
//!
//! let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();
//!
//! // No backing memory exists until the first allocation.
//! assert_eq!(pool.capacity(), 0);
//!
//! let addr = pool.allocate()?;
//!
//! // SAFETY: The chunk has u64 size and alignment and we own it exclusively.
//! unsafe {
//!     addr.cast::<u64>().write(0xdead_beef);
//! }
//!
//! // SAFETY: The address was returned by this pool and has not been deallocated since.
//! unsafe {
//!     pool.deallocate(addr);
//! }
//!
//! // The chunk is reused; the pool did not grow.
//! let reused = pool.allocate()?;
//! assert_eq!(reused, addr);
//! # Ok::<(), fixed_block_pool::Error>(())
//! ```
//!
//! Shared typed handles:
//!
//! ```rust
//! use fixed_block_pool::PoolAllocator;
//!
//! let allocator = PoolAllocator::<u64>::new();
//! let colleague = allocator.clone();
//!
//! // Clones share one pool; equality is pool identity.
//! assert_eq!(allocator, colleague);
//!
//! let chunk = allocator.allocate(1)?;
//!
//! // Memory allocated through one handle may be released through another.
//! // SAFETY: The chunk came from the shared pool with count 1 and is returned once.
//! unsafe {
//!     colleague.deallocate(chunk, 1);
//! }
//! # Ok::<(), fixed_block_pool::Error>(())
//! ```
//!
//! # Caller obligations
//!
//! [`FixedBlockPool::deallocate()`] performs no ownership, bounds or double-free checking in
//! release builds. This is a deliberate performance trade-off: the pool trusts its caller the
//! way the system allocator does. Debug builds validate the preconditions with assertions, so
//! misuse is caught where it is cheapest to diagnose.

mod adapter;
mod block;
mod builder;
mod error;
mod pool;

pub use adapter::*;
pub(crate) use block::*;
pub use builder::*;
pub use error::*;
pub(crate) use error::Result;
pub use pool::FixedBlockPool;
