//! Stack allocator benchmarks
//!
//! Usage patterns a scratch allocator sees in practice: tight push/pop
//! pairs, nested scopes, and traffic that keeps crossing a page boundary.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use ustack::{ReservedHeap, StackAllocator, StackConfig};

fn new_stack(pages: usize, config: StackConfig) -> StackAllocator<ReservedHeap> {
    StackAllocator::with_config(ReservedHeap::new(pages).unwrap(), config).unwrap()
}

/// Single allocate/deallocate pair at various sizes
fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");
    group.throughput(Throughput::Elements(1));

    for size in [8usize, 64, 256, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut stack = new_stack(4, StackConfig::performance());
            b.iter(|| {
                let buffer = stack.allocate(black_box(size)).unwrap();
                black_box(buffer);
                stack.deallocate().unwrap();
            });
        });
    }

    group.finish();
}

/// Nested scopes, as in a recursive descent over a tree
fn bench_nested_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_frames");

    group.bench_function("depth_32", |b| {
        let mut stack = new_stack(8, StackConfig::performance());
        b.iter(|| {
            let marker = stack.mark();
            for depth in 0..32 {
                let buffer = stack.allocate(16 + depth * 4).unwrap();
                black_box(buffer);
            }
            stack.release(marker).unwrap();
        });
    });

    group.finish();
}

/// Allocations that oscillate across a page boundary, forcing grow/release
fn bench_page_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_boundary");

    for (name, config) in [
        ("performance", StackConfig::performance()),
        ("debug_patterns", StackConfig::debug()),
    ] {
        group.bench_function(name, |b| {
            let mut stack = new_stack(4, config.clone());
            for _ in 0..7 {
                stack.allocate(512).unwrap();
            }
            b.iter(|| {
                stack.allocate(512).unwrap();
                stack.allocate(512).unwrap();
                stack.deallocate().unwrap();
                stack.deallocate().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_nested_frames, bench_page_boundary);
criterion_main!(benches);
