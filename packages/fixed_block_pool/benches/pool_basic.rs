//! Basic benchmarks for the `fixed_block_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use fixed_block_pool::FixedBlockPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("pool_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    FixedBlockPool::builder().layout_of::<TestItem>().build(),
                ));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_first");
    group.bench_function("allocate_first", |b| {
        b.iter_custom(|iters| {
            let mut pools =
                iter::repeat_with(|| FixedBlockPool::builder().layout_of::<TestItem>().build())
                    .take(usize::try_from(iters).unwrap())
                    .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                // The first allocation pays for carving a whole block.
                _ = black_box(pool.allocate().unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("churn_one");
    group.bench_function("churn_one", |b| {
        b.iter_custom(|iters| {
            let mut pool = FixedBlockPool::builder().layout_of::<TestItem>().build();

            // Warm the pool so the loop below never grows it.
            let warmup = pool.allocate().unwrap();
            // SAFETY: The address was returned by this pool and has not been deallocated since.
            unsafe {
                pool.deallocate(warmup);
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let addr = black_box(pool.allocate().unwrap());
                // SAFETY: The address was just returned by this pool.
                unsafe {
                    pool.deallocate(addr);
                }
            }

            start.elapsed()
        });
    });

    // The comparison the pool exists to win: many small fixed-size allocations
    // served by the pool versus the system allocator.

    let allocs_op = allocs.operation("allocate_10k_pool");
    group.bench_function("allocate_10k_pool", |b| {
        b.iter_custom(|iters| {
            let mut pools =
                iter::repeat_with(|| FixedBlockPool::builder().layout_of::<TestItem>().build())
                    .take(usize::try_from(iters).unwrap())
                    .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                for _ in 0..10_000 {
                    _ = black_box(pool.allocate().unwrap());
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_10k_system");
    group.bench_function("allocate_10k_system", |b| {
        b.iter_custom(|iters| {
            let mut boxes: Vec<Box<TestItem>> = Vec::with_capacity(10_000);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                for _ in 0..10_000 {
                    boxes.push(black_box(Box::new(black_box(1024_usize))));
                }
                boxes.clear();
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
