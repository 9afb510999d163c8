//! Benchmarks for netblock lookup and bundle resolution.
//!
//! Run with: cargo bench
//!
//! This benchmark suite measures:
//! - IPv4 table lookup throughput across table sizes
//! - IPv6 prefix matching
//! - Full address-to-bundle resolution on the embedded data set

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netblock::{
    loader, EngineConfig, Ipv6Prefix, Ipv6PrefixMatcher, NetblockRange, NetblockTable,
};

/// Build a table of `count` disjoint /24 ranges spaced one /24 apart.
fn generate_table(count: usize) -> NetblockTable {
    let ranges = (0..count as u32)
        .map(|i| {
            let low = (i * 2) << 8;
            NetblockRange::new(low, low + 255, (i % 60) as i32)
        })
        .collect();
    NetblockTable::from_ranges(ranges).unwrap()
}

/// Generate addresses, half inside ranges and half in the gaps.
fn generate_ips(count: usize, table_size: usize) -> Vec<u32> {
    (0..count as u32)
        .map(|i| {
            let block = (i % table_size as u32) * 2 + (i % 2);
            (block << 8) | 17
        })
        .collect()
}

/// Benchmark IPv4 lookup scalability with different table sizes.
fn bench_ipv4_scalability(c: &mut Criterion) {
    let mut group = c.benchmark_group("ipv4_lookup");

    for size in [100, 1_000, 10_000, 100_000].iter() {
        let table = generate_table(*size);
        let ips = generate_ips(1_000, *size);

        group.throughput(Throughput::Elements(ips.len() as u64));
        group.bench_with_input(BenchmarkId::new("ranges", size), size, |b, _| {
            b.iter(|| {
                for ip in &ips {
                    black_box(table.lookup(*ip));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark textual IPv6 prefix matching.
fn bench_ipv6_prefix(c: &mut Criterion) {
    let prefixes = (0..32u16)
        .map(|i| Ipv6Prefix::new(&format!("2001:{:X}:", 0x4400 + i), 32, i as i32).unwrap())
        .collect();
    let matcher = Ipv6PrefixMatcher::new(prefixes);

    let addresses: Vec<String> = (0..64u16)
        .map(|i| format!("2001:{:x}:abcd::{}", 0x4400 + i, i))
        .collect();

    let mut group = c.benchmark_group("ipv6_prefix");
    group.throughput(Throughput::Elements(addresses.len() as u64));

    group.bench_function("mixed_addresses", |b| {
        b.iter(|| {
            for address in &addresses {
                black_box(matcher.lookup(address));
            }
        })
    });

    group.finish();
}

/// Benchmark full resolution against the embedded data.
fn bench_resolve(c: &mut Criterion) {
    let resolver = loader::load_embedded(EngineConfig::default()).unwrap();
    let addresses = [
        "203.167.129.4",
        "196.38.180.3",
        "150.101.1.1",
        "8.8.8.8",
        "2001:4478:abcd::1",
        "127.0.0.1",
    ];

    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(addresses.len() as u64));

    group.bench_function("embedded", |b| {
        b.iter(|| {
            for address in &addresses {
                black_box(resolver.resolve(address, Some("NZ")).unwrap());
            }
        })
    });

    group.bench_function("classify_only", |b| {
        b.iter(|| {
            for address in &addresses {
                black_box(resolver.classify(address).unwrap());
            }
        })
    });

    group.finish();
}

/// Benchmark loading the embedded data set.
fn bench_load(c: &mut Criterion) {
    c.bench_function("load_embedded", |b| {
        b.iter(|| black_box(loader::load_embedded(EngineConfig::default()).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_ipv4_scalability,
    bench_ipv6_prefix,
    bench_resolve,
    bench_load,
);

criterion_main!(benches);
