//! The bucket sort protocol, scatter, partition, exchange, local sort and gather, run identically
//! by every process.
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{
    config::BucketSortConfig,
    instrumentation::{reduce_report, time_phase, PhaseTime, PhaseType, ProcessReport, Summary},
    sorting::{
        exchange::{exchange, negotiate},
        gather::gather_sorted,
        local_sort::local_sort,
        partition::partition,
    },
    traits::{
        transport::Transport,
        types::{Error, Key, Result},
    },
};

// Announced in place of a length when the coordinator was given no dataset
const MISSING_DATASET: usize = usize::MAX;

/// Outcome of a bucket sort on one process
#[derive(Clone, Debug)]
pub struct BucketSortOutput<T> {
    /// Globally sorted dataset, only on the coordinator
    pub sorted: Option<Vec<T>>,

    /// Sorted keys owned by this process, a contiguous slice of the global order
    pub partition: Vec<T>,

    /// Measurements taken by this process
    pub report: ProcessReport,

    /// Reduced measurements, only on the coordinator
    pub summary: Option<Summary>,

    /// Trailing elements of the dataset left out by [`crate::RemainderPolicy::Truncate`]
    pub dropped: usize,
}

/// Sort a dataset held by the coordinator across all processes of `comm`.
///
/// Must be called by every process with the same configuration. Configuration errors are detected
/// before the first data carrying collective and are reported identically by every process.
///
/// # Arguments
/// * `dataset` - The `config.n_elements` keys to sort, significant only on the coordinator.
/// * `config` - Run configuration, identical on every process.
/// * `comm` - Transport shared by all processes.
pub fn bucket_sort<T, C>(
    dataset: Option<&[T]>,
    config: &BucketSortConfig<T>,
    comm: &C,
) -> Result<BucketSortOutput<T>>
where
    T: Key,
    C: Transport,
{
    let context = comm.context();
    let plan = config.validate(context.size)?;
    let counts = config.scatter_counts(context.size)?;
    let n_scattered = counts.iter().sum::<usize>();

    // Only the coordinator can see the dataset, share its length so every process aborts together
    let announced = comm.broadcast(dataset.map_or(MISSING_DATASET, <[T]>::len))?;
    if announced == MISSING_DATASET {
        return Err(Error::Configuration("the coordinator holds no dataset".to_string()));
    }
    if announced != config.n_elements {
        return Err(Error::Configuration(format!(
            "coordinator holds {} elements but {} were configured",
            announced, config.n_elements
        )));
    }

    let dropped = config.dropped(context.size);
    if dropped > 0 && context.is_coordinator() {
        warn!(
            dropped,
            n_elements = config.n_elements,
            n_processes = context.size,
            "truncating remainder of an uneven division"
        );
    }

    let dataset = if context.is_coordinator() {
        dataset.map(|d| &d[..n_scattered])
    } else {
        None
    };

    let mut phase_times = Vec::new();

    comm.barrier()?;
    let start = Instant::now();

    let local = time_phase(PhaseType::Scatter, &mut phase_times, || {
        comm.scatter_varcount(dataset, &counts)
    })?;

    let buckets = time_phase(PhaseType::Partition, &mut phase_times, || {
        partition(&local, &plan)
    });
    drop(local);

    let exchange_plan = time_phase(PhaseType::CountExchange, &mut phase_times, || {
        negotiate(&buckets, comm)
    })?;

    let mut owned = time_phase(PhaseType::DataExchange, &mut phase_times, || {
        exchange(buckets, &exchange_plan, comm)
    })?;

    let sort_start = Instant::now();
    local_sort(&mut owned, config.local_sort);
    let sort_time = sort_start.elapsed();
    phase_times.push(PhaseTime::from_duration(PhaseType::LocalSort, sort_time));

    let sorted = time_phase(PhaseType::Gather, &mut phase_times, || {
        gather_sorted(&owned, comm)
    })?;

    let total_time = start.elapsed();

    let report = ProcessReport {
        rank: context.rank,
        partition_size: owned.len(),
        sort_time,
        total_time,
        phase_times,
    };

    debug!(
        rank = context.rank,
        partition_size = report.partition_size,
        sort_s = sort_time.as_secs_f64(),
        total_s = total_time.as_secs_f64(),
        "bucket sort complete"
    );

    let summary = reduce_report(&report, comm)?;

    if let Some(summary) = summary.as_ref() {
        info!(
            n_processes = summary.n_processes,
            total_size = summary.total_size,
            max_sort_s = summary.max_sort_time,
            max_total_s = summary.max_total_time,
            communication_s = summary.communication_overhead(),
            imbalance = summary.load_balance.imbalance(),
            "bucket sort summary"
        );
    }

    Ok(BucketSortOutput {
        sorted,
        partition: owned,
        report,
        summary,
        dropped,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::{Distribution, RemainderPolicy},
        generator::generate,
        sorting::{local_sort::LocalSortKind, partition::RangePartitionPlan},
        transport::LocalCluster,
    };
    use itertools::Itertools;

    /// Run the protocol over `size` in-process ranks with `input` held by the coordinator.
    fn run<T: Key>(
        size: usize,
        input: &[T],
        config: &BucketSortConfig<T>,
    ) -> Vec<Result<BucketSortOutput<T>>> {
        LocalCluster::new(size).run(|comm| {
            let dataset = if comm.context().is_coordinator() {
                Some(input)
            } else {
                None
            };
            bucket_sort(dataset, config, &comm)
        })
    }

    fn sorted_copy<T: Key>(input: &[T]) -> Vec<T> {
        let mut expected = input.to_vec();
        expected.sort();
        expected
    }

    #[test]
    fn test_two_processes() {
        let input = [5, 1, 9, 3, 7, 0, 8, 2, 6, 4];
        let config = BucketSortConfig::new(input.len(), 0i32, 9);
        let outputs = run(2, &input, &config)
            .into_iter()
            .map(|o| o.unwrap())
            .collect_vec();

        assert_eq!(
            outputs[0].sorted.as_deref(),
            Some(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9][..])
        );
        assert_eq!(outputs[0].partition, vec![0, 1, 2, 3, 4]);
        assert_eq!(outputs[1].partition, vec![5, 6, 7, 8, 9]);
        assert!(outputs[1].sorted.is_none());
        assert!(outputs[1].summary.is_none());
    }

    #[test]
    fn test_three_processes() {
        let input = [8, 0, 4, 7, 1, 5, 3, 6, 2];
        let config = BucketSortConfig::new(input.len(), 0i32, 8);
        let outputs = run(3, &input, &config)
            .into_iter()
            .map(|o| o.unwrap())
            .collect_vec();

        assert_eq!(outputs[0].partition, vec![0, 1, 2]);
        assert_eq!(outputs[1].partition, vec![3, 4, 5]);
        assert_eq!(outputs[2].partition, vec![6, 7, 8]);
        assert_eq!(outputs[0].sorted, Some((0..=8).collect_vec()));

        let summary = outputs[0].summary.as_ref().unwrap();
        assert_eq!(summary.n_processes, 3);
        assert_eq!(summary.total_size, 9);
        assert_eq!(summary.load_balance.partition_sizes, vec![3, 3, 3]);
        assert!(summary.max_total_time >= summary.max_sort_time);
    }

    #[test]
    fn test_configuration_error_on_every_rank() {
        let input = [0, 1, 2, 3, 3];
        let config = BucketSortConfig::new(input.len(), 0i32, 3);
        for output in run(5, &input, &config) {
            assert!(matches!(output, Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn test_skewed_to_minimum() {
        let input = vec![0u32; 40];
        let config = BucketSortConfig::new(input.len(), 0u32, 1_000);
        let outputs = run(4, &input, &config)
            .into_iter()
            .map(|o| o.unwrap())
            .collect_vec();

        assert_eq!(outputs[0].partition.len(), 40);
        for output in outputs.iter().skip(1) {
            assert!(output.partition.is_empty());
            assert_eq!(output.report.partition_size, 0);
        }
        assert_eq!(outputs[0].sorted, Some(input));
        let summary = outputs[0].summary.as_ref().unwrap();
        assert_eq!(summary.load_balance.imbalance(), 4.0);
    }

    #[test]
    fn test_single_process_identity() {
        let input = generate(1_000, -500i64, 500, Distribution::Uniform, Some(3)).unwrap();
        let config = BucketSortConfig::new(input.len(), -500i64, 500);
        let outputs = run(1, &input, &config);
        let output = outputs.into_iter().next().unwrap().unwrap();
        assert_eq!(output.sorted, Some(sorted_copy(&input)));
    }

    #[test]
    fn test_conservation_sortedness_and_containment() {
        let (min, max) = (10u64, 50_000u64);
        for distribution in [
            Distribution::Uniform,
            Distribution::Normal,
            Distribution::Exponential,
        ] {
            for size in [2, 3, 5, 8] {
                let input = generate(2_003, min, max, distribution, Some(size as u64)).unwrap();
                let config = BucketSortConfig::new(input.len(), min, max)
                    .with_distribution(distribution)
                    .with_local_sort(LocalSortKind::Parallel);
                let outputs = run(size, &input, &config)
                    .into_iter()
                    .map(|o| o.unwrap())
                    .collect_vec();

                let sorted = outputs[0].sorted.clone().unwrap();
                assert_eq!(sorted, sorted_copy(&input));
                assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
                assert!(sorted.iter().all(|&v| min <= v && v <= max));

                // Owned partitions are contiguous, increasing slices of the global order
                let plan = RangePartitionPlan::new(min, max, size).unwrap();
                for (rank, output) in outputs.iter().enumerate() {
                    assert!(output.partition.iter().all(|&v| plan.owner(v) == rank));
                }
                let concatenated = outputs
                    .iter()
                    .flat_map(|o| o.partition.iter().copied())
                    .collect_vec();
                assert_eq!(concatenated, sorted);
            }
        }
    }

    #[test]
    fn test_remainder_distributed() {
        let input = generate(10, 0i32, 99, Distribution::Uniform, Some(11)).unwrap();
        let config = BucketSortConfig::new(input.len(), 0i32, 99);
        let outputs = run(4, &input, &config);
        let output = outputs.into_iter().next().unwrap().unwrap();
        assert_eq!(output.dropped, 0);
        assert_eq!(output.sorted, Some(sorted_copy(&input)));
    }

    #[test]
    fn test_remainder_truncated() {
        let input = (0..10).rev().collect_vec();
        let config =
            BucketSortConfig::new(input.len(), 0i32, 9).with_remainder(RemainderPolicy::Truncate);
        let outputs = run(4, &input, &config)
            .into_iter()
            .map(|o| o.unwrap())
            .collect_vec();

        // Each rank receives two elements, the last two of the dataset are reported as dropped
        assert!(outputs.iter().all(|o| o.dropped == 2));
        assert_eq!(outputs[0].sorted, Some(sorted_copy(&input[..8])));
    }

    #[test]
    fn test_remainder_rejected() {
        let input = (0..10).collect_vec();
        let config =
            BucketSortConfig::new(input.len(), 0i32, 9).with_remainder(RemainderPolicy::Reject);
        for output in run(4, &input, &config) {
            assert!(matches!(output, Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn test_dataset_length_mismatch() {
        let input = (0..10).collect_vec();
        let config = BucketSortConfig::new(12, 0i32, 9);
        for output in run(3, &input, &config) {
            assert!(matches!(output, Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn test_missing_dataset_on_every_rank() {
        for n_elements in [0, 10] {
            let config = BucketSortConfig::new(n_elements, 0i32, 9);
            let outputs =
                LocalCluster::new(2).run(|comm| bucket_sort::<i32, _>(None, &config, &comm));
            for output in outputs {
                assert!(matches!(output, Err(Error::Configuration(_))));
            }
        }
    }

    #[test]
    fn test_empty_dataset() {
        let config = BucketSortConfig::new(0, 0u16, 100);
        let outputs = run(3, &[], &config);
        let output = outputs.into_iter().next().unwrap().unwrap();
        assert_eq!(output.sorted, Some(Vec::new()));
        assert_eq!(output.summary.unwrap().total_size, 0);
    }

    #[test]
    fn test_phase_times_recorded() {
        let input = (0..100).rev().collect_vec();
        let config = BucketSortConfig::new(input.len(), 0i32, 99);
        let outputs = run(2, &input, &config);
        for output in outputs {
            let report = output.unwrap().report;
            for phase in [
                PhaseType::Scatter,
                PhaseType::Partition,
                PhaseType::CountExchange,
                PhaseType::DataExchange,
                PhaseType::LocalSort,
                PhaseType::Gather,
            ] {
                assert!(report.phase_time(phase).is_some());
            }
            assert_eq!(report.phase_time(PhaseType::LocalSort), Some(report.sort_time));
            assert!(report.total_time >= report.sort_time);
        }
    }
}
