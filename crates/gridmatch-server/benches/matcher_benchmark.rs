//! Matcher benchmarks: descriptor parsing and end-to-end `requestJob`
//! matching against an in-memory job store of varying queue counts.
//!
//! ## Running
//!
//! ```bash
//! cargo bench --package gridmatch-server
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gridmatch_core::id::QueueId;
use gridmatch_matcher::expr::parse as parse_descriptor;
use gridmatch_matcher::store::InMemoryJobStore;
use gridmatch_matcher::{MatcherComponent, MatcherServiceInterface};
use std::sync::Arc;

fn benchmark_descriptor_parsing(c: &mut Criterion) {
    let jdl = r#"[ CPUs = 8; Memory = 16000; Site = "CERN.ch"; Tags = { "multicore", "gpu" }; ]"#;

    c.bench_function("expr/parse_descriptor", |b| {
        b.iter(|| {
            let parsed = parse_descriptor(black_box(jdl)).unwrap();
            black_box(parsed)
        })
    });
}

fn seeded_store(queue_count: u64) -> Arc<InMemoryJobStore> {
    let store = Arc::new(InMemoryJobStore::new());
    store.allow_site("CERN.ch");
    for i in 0..queue_count {
        store.seed_queue(QueueId(i + 1), r#"[ CPUs <= 8; Site = "CERN.ch"; ]"#, (queue_count - i) as i64);
    }
    store
}

fn benchmark_check_for_jobs(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher/check_for_jobs");
    let resource_jdl = r#"[ CPUs = 4; Site = "CERN.ch"; ]"#;

    for queue_count in [1u64, 10, 100, 1000] {
        let store = seeded_store(queue_count);
        let matcher = MatcherComponent::new(store, 10_000);
        let runtime = tokio::runtime::Runtime::new().unwrap();

        group.throughput(Throughput::Elements(queue_count));
        group.bench_with_input(BenchmarkId::from_parameter(queue_count), &queue_count, |b, _| {
            b.to_async(&runtime).iter(|| async {
                let report = matcher.check_for_jobs(black_box(resource_jdl)).await.unwrap();
                black_box(report)
            })
        });
    }

    group.finish();
}

criterion_group!(
    name = expr_benches;
    config = Criterion::default().sample_size(200);
    targets = benchmark_descriptor_parsing
);

criterion_group!(
    name = matching_benches;
    config = Criterion::default().sample_size(50);
    targets = benchmark_check_for_jobs
);

criterion_main!(expr_benches, matching_benches);
