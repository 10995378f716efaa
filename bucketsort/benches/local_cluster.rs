use std::time::Duration;

use bucketsort::{
    bucket_sort, generator::generate, BucketSortConfig, Distribution, LocalCluster, LocalSortKind,
    Transport,
};
use criterion::{criterion_group, criterion_main, Criterion};

fn bucket_sort_local_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bucket Sort i32 Local Cluster");

    group
        .sample_size(10)
        .measurement_time(Duration::from_secs(10));

    let n = 1_000_000;
    let (min, max) = (0i32, 1_000_000);

    for distribution in [
        Distribution::Uniform,
        Distribution::Normal,
        Distribution::Exponential,
    ] {
        let dataset = generate(n, min, max, distribution, Some(0)).unwrap();

        for n_processes in [1, 2, 4, 8] {
            let cluster = LocalCluster::new(n_processes);

            for local_sort in [LocalSortKind::Unstable, LocalSortKind::Parallel] {
                let config = BucketSortConfig::new(n, min, max)
                    .with_distribution(distribution)
                    .with_local_sort(local_sort);

                group.bench_function(
                    format!("{} P={} local_sort={}", distribution, n_processes, local_sort),
                    |b| {
                        b.iter(|| {
                            cluster.run(|comm| {
                                let data = comm.context().is_coordinator().then_some(&dataset[..]);
                                bucket_sort(data, &config, &comm).unwrap()
                            })
                        })
                    },
                );
            }
        }
    }
}

criterion_group!(benches, bucket_sort_local_cluster);
criterion_main!(benches);
