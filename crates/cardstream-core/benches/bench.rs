use cardstream_core::{
    BoundedTaskPool, Catalog, CatalogEntry, GeneratorConfig, Locale, PoolConfig, RecordGenerator,
    encode_frame,
};
use core::{hint::black_box, time::Duration};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::sync::Arc;
use tokio::runtime::Builder;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

fn catalog() -> Arc<Catalog> {
    let entries = (1..=151)
        .map(|id| CatalogEntry::new(id, [(Locale::French, format!("card-{id}"))]))
        .collect();
    Arc::new(Catalog::new(entries).unwrap())
}

fn generator() -> RecordGenerator {
    RecordGenerator::new(
        catalog(),
        GeneratorConfig {
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            locale: Locale::French,
            seed: Some(7),
        },
    )
}

/// Drains a full pool run with no emitter attached, to isolate dispatch and
/// completion overhead.
fn bench_pool(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let generator = generator();
    let total = 5_000;

    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(total as u64));
    for concurrency in [1, 10, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                let generator = generator.clone();
                b.to_async(&rt).iter(|| {
                    let generator = generator.clone();
                    async move {
                        let config = PoolConfig::new(total, concurrency).unwrap();
                        let pool = BoundedTaskPool::new(config);
                        let (mut records, handle) = pool.spawn(
                            move |seq| {
                                let generator = generator.clone();
                                async move { generator.generate(seq).await }
                            },
                            CancellationToken::new(),
                        );
                        while let Some(record) = records.next().await {
                            black_box(record);
                        }
                        handle.join().await.unwrap()
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let record = rt.block_on(generator().generate(1)).unwrap();

    let mut group = c.benchmark_group("frame");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode", |b| {
        b.iter(|| encode_frame(black_box(&record)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_pool, bench_encode);
criterion_main!(benches);
