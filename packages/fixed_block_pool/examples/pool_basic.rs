//! Basic usage example for `FixedBlockPool`.
//!
//! This example demonstrates the pool's lifecycle: lazy growth on first allocation,
//! LIFO reuse of freed chunks, and growth when the free chunks run out.

use fixed_block_pool::FixedBlockPool;

fn main() -> Result<(), fixed_block_pool::Error> {
    // Create a pool serving u64-shaped chunks.
    let mut pool = FixedBlockPool::builder().layout_of::<u64>().build();

    println!("Fresh pool: capacity {} chunks", pool.capacity());

    // The first allocation carves a whole block into chunks.
    let addr = pool.allocate()?;

    println!(
        "After first allocation: capacity {} chunks across {} block(s)",
        pool.capacity(),
        pool.block_count()
    );

    // The chunk is raw memory; write and read it back.
    // SAFETY: The chunk has u64 size and alignment and we own it exclusively.
    unsafe {
        addr.cast::<u64>().write(0xdead_beef);
        println!("Chunk content: {:#x}", addr.cast::<u64>().read());
    }

    // SAFETY: The address was returned by this pool and has not been deallocated since.
    unsafe {
        pool.deallocate(addr);
    }

    // The freed chunk is reused before anything else.
    let reused = pool.allocate()?;
    assert_eq!(reused, addr);
    println!("Freed chunk was reused");

    // Exhausting the capacity triggers a second block.
    while pool.len() < pool.capacity() {
        _ = pool.allocate()?;
    }
    _ = pool.allocate()?;

    println!(
        "After exhausting the first block: capacity {} chunks across {} block(s)",
        pool.capacity(),
        pool.block_count()
    );

    Ok(())
}
