//! Integration tests for the `fixed_block_pool` package.
//!
//! These tests exercise [`PoolAllocator<T>`] the way a container-like client would:
//! shared handles, rebinding to an internal node type, and mixed single/bulk traffic.

#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::arithmetic_side_effects,
    reason = "test code doesn't need the same safety rigor as production code"
)]

use std::ptr::NonNull;

use fixed_block_pool::PoolAllocator;

/// The node shape a singly linked list would carve from the pool.
struct Node {
    value: u64,
    next: Option<NonNull<Node>>,
}

/// Builds a pool-backed linked list of `count` nodes, then tears it down, verifying the sum.
///
/// This is the usage pattern the adapter exists for: the client starts with an allocator for
/// its element type and rebinds to the node type before the first allocation.
#[test]
fn linked_list_round_trip() {
    let for_elements = PoolAllocator::<u64>::new();
    let for_nodes = for_elements.cast::<Node>();

    let count = 1_000_u64;
    let mut head: Option<NonNull<Node>> = None;

    for value in 0..count {
        let node = for_nodes.allocate(1).expect("out of memory");

        unsafe {
            node.write(Node { value, next: head });
        }
        head = Some(node);
    }

    let mut sum = 0_u64;
    let mut cursor = head;

    while let Some(node) = cursor {
        unsafe {
            sum += (*node.as_ptr()).value;
            cursor = (*node.as_ptr()).next;

            for_nodes.deallocate(node, 1);
        }
    }

    assert_eq!(sum, (0..count).sum());
}

#[test]
fn handles_interchange_within_one_pool() {
    let a = PoolAllocator::<u64>::new();
    let b = a.clone();
    let c = b.clone();

    // All three are the same allocator as far as a container is concerned.
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a, c);

    let from_a = a.allocate(1).expect("out of memory");
    let from_b = b.allocate(1).expect("out of memory");

    // Chunks may be returned through any handle of the same pool.
    unsafe {
        c.deallocate(from_a, 1);
        c.deallocate(from_b, 1);
    }
}

#[test]
fn unrelated_pools_are_never_equal() {
    let a = PoolAllocator::<u64>::new();
    let b = PoolAllocator::<u64>::new();

    assert_ne!(a, b);

    // Rebinding does not change identity.
    let a_nodes = a.cast::<[u64; 2]>();
    assert_ne!(a_nodes, b);
}

#[test]
fn mixed_single_and_bulk_traffic() {
    let allocator = PoolAllocator::<u32>::new();

    let singles: Vec<_> = (0..100)
        .map(|_| allocator.allocate(1).expect("out of memory"))
        .collect();

    let bulk = allocator.allocate(256).expect("out of memory");

    unsafe {
        for (index, chunk) in singles.iter().enumerate() {
            chunk.write(u32::try_from(index).unwrap());
        }

        for offset in 0..256 {
            bulk.add(offset).write(u32::try_from(offset).unwrap());
        }

        for (index, chunk) in singles.iter().enumerate() {
            assert_eq!(chunk.read(), u32::try_from(index).unwrap());
        }

        for offset in 0..256 {
            assert_eq!(bulk.add(offset).read(), u32::try_from(offset).unwrap());
        }

        for chunk in singles {
            allocator.deallocate(chunk, 1);
        }

        allocator.deallocate(bulk, 256);
    }
}

#[test]
fn pool_survives_as_long_as_any_handle() {
    let chunk;
    let survivor;

    {
        let original = PoolAllocator::<u64>::new();
        survivor = original.clone();

        chunk = original.allocate(1).expect("out of memory");
        // `original` is dropped here; the shared pool lives on in `survivor`.
    }

    unsafe {
        chunk.write(77);
        assert_eq!(chunk.read(), 77);

        survivor.deallocate(chunk, 1);
    }

    let reused = survivor.allocate(1).expect("out of memory");
    assert_eq!(reused, chunk);
}
