use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use jobpool::{BoxError, CancellationToken, Job, JobDescriptor, PoolConfig, WorkerPool};
use std::sync::Arc;
use tokio::runtime::Builder;

const JOBS: usize = 4096;

fn make_jobs() -> Vec<Job<u64, u64>> {
    let body = Arc::new(|_token: CancellationToken, n: u64| async move {
        Ok::<_, BoxError>(black_box(n.wrapping_mul(31)))
    });
    (0..JOBS as u64)
        .map(|i| Job::new(JobDescriptor::new(i.to_string(), "bench"), body.clone(), i))
        .collect()
}

async fn run_pool(workers: usize, jobs: Vec<Job<u64, u64>>) {
    let pool = Arc::new(
        WorkerPool::with_config(
            PoolConfig::new(workers)
                .with_queue_capacity(256)
                .with_result_capacity(256),
        )
        .expect("valid config"),
    );
    let mut results = pool.results().expect("results taken once");
    pool.start(CancellationToken::new()).expect("started once");

    let feeder = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.feed(jobs).await })
    };

    let mut received = 0;
    while let Some(result) = results.recv().await {
        black_box(result);
        received += 1;
    }
    assert_eq!(received, JOBS);
    feeder.await.expect("feeder panicked").expect("feed once");
}

fn bench_throughput(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(JOBS as u64));

    for workers in [1, 4, num_cpus::get()] {
        group.bench_function(format!("workers/{workers}"), |b| {
            b.to_async(&rt)
                .iter_batched(make_jobs, |jobs| run_pool(workers, jobs), criterion::BatchSize::SmallInput);
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
