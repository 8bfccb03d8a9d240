//! Benchmarks for prefix trie operations.

use cidrtree::{Ipv4Net, PrefixTrie};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::net::Ipv4Addr;

/// Consecutive /24 blocks starting at 10.0.0.0
fn generate_blocks(n: usize) -> Vec<Ipv4Net> {
    (0..n)
        .map(|i| {
            let addr = Ipv4Addr::from(0x0a00_0000u32 + ((i as u32) << 8));
            Ipv4Net::new(addr, 24).unwrap()
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 50_000] {
        let blocks = generate_blocks(size);
        group.bench_with_input(BenchmarkId::new("PrefixTrie", size), &blocks, |b, blocks| {
            b.iter(|| {
                let trie: PrefixTrie = blocks.iter().copied().collect();
                black_box(trie)
            });
        });
    }

    group.finish();
}

fn bench_supernet(c: &mut Criterion) {
    let mut group = c.benchmark_group("supernet");

    for size in [1_000, 10_000, 50_000] {
        let blocks = generate_blocks(size);
        let trie: PrefixTrie = blocks.iter().copied().collect();
        let queries: Vec<Ipv4Net> = blocks
            .iter()
            .map(|net| Ipv4Net::new(net.network(), 28).unwrap())
            .collect();

        group.bench_with_input(BenchmarkId::new("PrefixTrie", size), &queries, |b, queries| {
            b.iter(|| {
                for query in queries {
                    black_box(trie.supernet(*query));
                }
            });
        });
    }

    group.finish();
}

fn bench_hole_punching(c: &mut Criterion) {
    c.bench_function("delete_from_slash8", |b| {
        let holes = generate_blocks(256);
        b.iter(|| {
            let mut trie = PrefixTrie::new();
            trie.insert("10.0.0.0/8".parse().unwrap());
            for hole in &holes {
                trie.delete(*hole);
            }
            black_box(trie.total_size())
        });
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let blocks: Vec<Ipv4Net> = generate_blocks(10_000)
        .into_iter()
        .flat_map(|net| net.subnets(26).unwrap())
        .collect();

    c.bench_function("aggregate_10k_blocks", |b| {
        b.iter(|| {
            let mut trie = PrefixTrie::new();
            for block in &blocks {
                trie.account(*block, 64);
            }
            black_box(trie.aggregate(1.0).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_supernet,
    bench_hole_punching,
    bench_aggregate
);
criterion_main!(benches);
