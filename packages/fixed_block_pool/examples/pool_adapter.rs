//! Typed adapter example for `PoolAllocator<T>`.
//!
//! Demonstrates the container-facing semantics: shared handles drawing from one pool,
//! identity-based equality, rebinding to a node type, and the bulk fallback path.

use std::ptr::NonNull;

use fixed_block_pool::PoolAllocator;

struct Node {
    value: u32,
    next: Option<NonNull<Node>>,
}

fn main() -> Result<(), fixed_block_pool::Error> {
    // A client starts with an allocator for its element type...
    let for_elements = PoolAllocator::<u32>::new();

    // ...and rebinds to its internal node type before the first allocation,
    // exactly as generic containers retarget their allocators.
    let for_nodes = for_elements.cast::<Node>();

    // Both handles reference the one pool.
    assert_eq!(for_elements, for_nodes);
    println!("Element and node handles share one pool");

    // Build a small linked list from pool chunks.
    let mut head: Option<NonNull<Node>> = None;

    for value in 0..10 {
        let node = for_nodes.allocate(1)?;

        // SAFETY: The chunk has Node size and alignment and we own it exclusively.
        unsafe {
            node.write(Node { value, next: head });
        }
        head = Some(node);
    }

    // Walk the list, then return every node to the pool.
    let mut sum = 0;
    let mut cursor = head;

    while let Some(node) = cursor {
        // SAFETY: Every node was initialized above and is freed exactly once below.
        unsafe {
            sum += (*node.as_ptr()).value;
            cursor = (*node.as_ptr()).next;

            for_nodes.deallocate(node, 1);
        }
    }

    println!("Sum over pool-backed list: {sum}");

    // A bulk request bypasses the pool and goes to the system allocator.
    let bulk = for_nodes.allocate(64)?;
    println!("Bulk request of 64 nodes served outside the pool");

    // SAFETY: The bulk pointer came from allocate() with the same count.
    unsafe {
        for_nodes.deallocate(bulk, 64);
    }

    Ok(())
}
