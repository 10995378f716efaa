//! Timing of the protocol phases, reduced to global maxima at the coordinator. Reporting only, none
//! of these values feed back into control flow.
use std::{
    fmt,
    time::{Duration, Instant},
};

use itertools::Itertools;

use crate::traits::{transport::Transport, types::Result};

/// Phases of the bucket sort protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseType {
    /// Initial distribution of the dataset
    Scatter,
    /// Classification of local keys into buckets
    Partition,
    /// Negotiation of exchange counts
    CountExchange,
    /// Variable count exchange of keys
    DataExchange,
    /// Sort of the owned partition
    LocalSort,
    /// Collection of sorted partitions at the coordinator
    Gather,
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseType::Scatter => "scatter",
            PhaseType::Partition => "partition",
            PhaseType::CountExchange => "count_exchange",
            PhaseType::DataExchange => "data_exchange",
            PhaseType::LocalSort => "local_sort",
            PhaseType::Gather => "gather",
        };
        write!(f, "{}", name)
    }
}

/// Wall clock duration of one protocol phase on one process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTime {
    /// Phase measured
    pub phase: PhaseType,

    /// Elapsed time
    pub time: Duration,
}

impl PhaseTime {
    /// Constructor from a measured duration
    pub fn from_duration(phase: PhaseType, time: Duration) -> Self {
        Self { phase, time }
    }

    /// Constructor from the instant at which the phase started
    pub fn from_instant(phase: PhaseType, start: Instant) -> Self {
        Self {
            phase,
            time: start.elapsed(),
        }
    }
}

/// Run `f`, recording its duration under `phase`.
pub fn time_phase<R>(phase: PhaseType, times: &mut Vec<PhaseTime>, f: impl FnOnce() -> R) -> R {
    let s = Instant::now();
    let result = f();
    times.push(PhaseTime::from_instant(phase, s));
    result
}

/// Measurements taken by one process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessReport {
    /// Rank of the process
    pub rank: usize,

    /// Number of keys owned after the exchange
    pub partition_size: usize,

    /// Duration of the local sort alone
    pub sort_time: Duration,

    /// Duration from the initial scatter to completion of the final gather
    pub total_time: Duration,

    /// Duration of every protocol phase
    pub phase_times: Vec<PhaseTime>,
}

impl ProcessReport {
    /// Time spent in `phase`, `None` if it was not measured.
    pub fn phase_time(&self, phase: PhaseType) -> Option<Duration> {
        let times = self
            .phase_times
            .iter()
            .filter(|t| t.phase == phase)
            .map(|t| t.time)
            .collect_vec();

        if times.is_empty() {
            None
        } else {
            Some(times.into_iter().sum())
        }
    }
}

impl fmt::Display for ProcessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rank {} -> Elements: {} | Sort: {:.6}s",
            self.rank,
            self.partition_size,
            self.sort_time.as_secs_f64()
        )
    }
}

/// Per rank workload after the exchange, range partitioning of skewed inputs yields unequal
/// partitions and therefore unequal sort times.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadBalance {
    /// Number of keys owned by each rank
    pub partition_sizes: Vec<usize>,

    /// Local sort time of each rank, in seconds
    pub sort_times: Vec<f64>,
}

impl LoadBalance {
    /// Mean number of keys per rank
    pub fn mean_partition_size(&self) -> f64 {
        if self.partition_sizes.is_empty() {
            return 0.0;
        }
        self.partition_sizes.iter().sum::<usize>() as f64 / self.partition_sizes.len() as f64
    }

    /// Largest number of keys owned by a single rank
    pub fn max_partition_size(&self) -> usize {
        self.partition_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Ratio of the largest partition to the mean partition, `1.0` for a perfect balance or an
    /// empty dataset.
    pub fn imbalance(&self) -> f64 {
        let mean = self.mean_partition_size();
        if mean == 0.0 {
            1.0
        } else {
            self.max_partition_size() as f64 / mean
        }
    }

    /// `(rank, partition size, sort time)` rows in rank order
    pub fn rows(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.partition_sizes
            .iter()
            .zip(self.sort_times.iter())
            .enumerate()
            .map(|(rank, (&size, &time))| (rank, size, time))
    }
}

/// Global view of a run, only available at the coordinator
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Number of cooperating processes
    pub n_processes: usize,

    /// Number of keys in the gathered sequence
    pub total_size: usize,

    /// Largest local sort time across processes, in seconds
    pub max_sort_time: f64,

    /// Largest total time across processes, in seconds
    pub max_total_time: f64,

    /// Per rank workload
    pub load_balance: LoadBalance,
}

impl Summary {
    /// Time not spent sorting, dominated by communication.
    pub fn communication_overhead(&self) -> f64 {
        self.max_total_time - self.max_sort_time
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========================================")?;
        writeln!(f, "PERFORMANCE RESULTS ({} cores)", self.n_processes)?;
        writeln!(f, "Total Array Size: {}", self.total_size)?;
        writeln!(f, "Max Local Sort Time: {:.6}s", self.max_sort_time)?;
        writeln!(f, "Max Total Algorithm: {:.6}s", self.max_total_time)?;
        writeln!(
            f,
            "Communication Overhead: {:.6}s",
            self.communication_overhead()
        )?;
        writeln!(
            f,
            "Load Imbalance (max/mean elements): {:.3}",
            self.load_balance.imbalance()
        )?;
        write!(f, "========================================")
    }
}

/// Reduce the reports of all processes to a [`Summary`] at the coordinator, `None` elsewhere.
///
/// # Arguments
/// * `report` - Measurements of the calling process.
/// * `comm` - Transport shared by all processes.
pub fn reduce_report<C: Transport>(report: &ProcessReport, comm: &C) -> Result<Option<Summary>> {
    let max_sort_time = comm.reduce_max(report.sort_time.as_secs_f64())?;
    let max_total_time = comm.reduce_max(report.total_time.as_secs_f64())?;
    let partition_sizes = comm.gather(report.partition_size)?;
    let sort_times = comm.gather(report.sort_time.as_secs_f64())?;

    match (max_sort_time, max_total_time, partition_sizes, sort_times) {
        (Some(max_sort_time), Some(max_total_time), Some(partition_sizes), Some(sort_times)) => {
            Ok(Some(Summary {
                n_processes: comm.size(),
                total_size: partition_sizes.iter().sum(),
                max_sort_time,
                max_total_time,
                load_balance: LoadBalance {
                    partition_sizes,
                    sort_times,
                },
            }))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::LocalCluster;
    use approx::assert_relative_eq;

    fn report(rank: usize, partition_size: usize, sort_ms: u64, total_ms: u64) -> ProcessReport {
        ProcessReport {
            rank,
            partition_size,
            sort_time: Duration::from_millis(sort_ms),
            total_time: Duration::from_millis(total_ms),
            phase_times: vec![PhaseTime::from_duration(
                PhaseType::LocalSort,
                Duration::from_millis(sort_ms),
            )],
        }
    }

    #[test]
    fn test_time_phase() {
        let mut times = Vec::new();
        let value = time_phase(PhaseType::Partition, &mut times, || 42);
        assert_eq!(value, 42);
        assert_eq!(times.len(), 1);
        assert_eq!(times[0].phase, PhaseType::Partition);
    }

    #[test]
    fn test_phase_time_lookup() {
        let mut r = report(0, 10, 5, 20);
        r.phase_times.push(PhaseTime::from_duration(
            PhaseType::LocalSort,
            Duration::from_millis(1),
        ));
        assert_eq!(r.phase_time(PhaseType::LocalSort), Some(Duration::from_millis(6)));
        assert_eq!(r.phase_time(PhaseType::Gather), None);
        assert_eq!(r.to_string(), "Rank 0 -> Elements: 10 | Sort: 0.005000s");
    }

    #[test]
    fn test_load_balance() {
        let balance = LoadBalance {
            partition_sizes: vec![10, 30, 20, 20],
            sort_times: vec![0.1, 0.3, 0.2, 0.2],
        };
        assert_relative_eq!(balance.mean_partition_size(), 20.0);
        assert_eq!(balance.max_partition_size(), 30);
        assert_relative_eq!(balance.imbalance(), 1.5);
        assert_eq!(balance.rows().nth(1), Some((1, 30, 0.3)));

        let empty = LoadBalance {
            partition_sizes: vec![0, 0],
            sort_times: vec![0.0, 0.0],
        };
        assert_relative_eq!(empty.imbalance(), 1.0);
    }

    #[test]
    fn test_reduce_report() {
        let summaries = LocalCluster::new(3).run(|comm| {
            let rank = comm.rank();
            let r = report(rank, 10 * (rank + 1), 10 * (rank as u64 + 1), 100 - 10 * rank as u64);
            reduce_report(&r, &comm)
        });

        let summaries = summaries.into_iter().map(|s| s.unwrap()).collect_vec();
        assert!(summaries[1].is_none() && summaries[2].is_none());

        let summary = summaries[0].as_ref().unwrap();
        assert_eq!(summary.n_processes, 3);
        assert_eq!(summary.total_size, 60);
        assert_relative_eq!(summary.max_sort_time, 0.03, epsilon = 1e-12);
        assert_relative_eq!(summary.max_total_time, 0.1, epsilon = 1e-12);
        assert_relative_eq!(summary.communication_overhead(), 0.07, epsilon = 1e-12);
        assert_eq!(summary.load_balance.partition_sizes, vec![10, 20, 30]);

        let rendered = summary.to_string();
        assert!(rendered.contains("PERFORMANCE RESULTS (3 cores)"));
        assert!(rendered.contains("Total Array Size: 60"));
    }
}
