use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mmdbkit::data_section::DataValue;
use mmdbkit::{Database, MmdbBuilder, RecordSize};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::hint::black_box;
use std::net::{IpAddr, Ipv4Addr};

const QUERIES: usize = 10_000;

/// Random /16-/32 networks with a handful of shared records
fn build_database(networks: usize, record_size: RecordSize, rng: &mut StdRng) -> Database {
    let records: Vec<HashMap<String, DataValue>> = (0..16)
        .map(|i| {
            let mut map = HashMap::new();
            map.insert("country".to_string(), DataValue::String(format!("C{}", i)));
            map.insert("asn".to_string(), DataValue::Uint32(64_512 + i));
            map
        })
        .collect();

    let mut builder = MmdbBuilder::new().with_record_size(record_size);
    for i in 0..networks {
        let addr = IpAddr::V4(Ipv4Addr::from(rng.random::<u32>()));
        let prefix_len = rng.random_range(16..=32);
        builder
            .add_network(addr, prefix_len, DataValue::Map(records[i % 16].clone()))
            .unwrap();
    }
    Database::from_bytes(builder.build().unwrap()).unwrap()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let mut rng = StdRng::seed_from_u64(0x5EED);

    let queries: Vec<IpAddr> = (0..QUERIES)
        .map(|_| IpAddr::V4(Ipv4Addr::from(rng.random::<u32>())))
        .collect();

    for networks in [1_000, 100_000] {
        for record_size in [RecordSize::Bits24, RecordSize::Bits28, RecordSize::Bits32] {
            let db = build_database(networks, record_size, &mut rng);

            group.throughput(Throughput::Elements(QUERIES as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("ipv4_{}bit", record_size.bits()), networks),
                &db,
                |b, db| {
                    b.iter(|| {
                        let mut hits = 0usize;
                        for &addr in &queries {
                            if db.lookup_ip(black_box(addr)).unwrap().is_some() {
                                hits += 1;
                            }
                        }
                        black_box(hits)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_lookup_text(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let db = build_database(10_000, RecordSize::Bits28, &mut rng);
    let queries: Vec<String> = (0..1_000)
        .map(|_| Ipv4Addr::from(rng.random::<u32>()).to_string())
        .collect();

    c.bench_function("lookup_str_1000", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(db.lookup(black_box(query)).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_lookup, bench_lookup_text);
criterion_main!(benches);
