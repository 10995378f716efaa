//! Range partitioning of a local slice into one bucket per owning process.
use crate::traits::types::{Error, Key, Result};

/// Maps every key in `[min, max]` to the process owning it. Process `i` owns the `i`'th interval of
/// width `ceil((max - min + 1) / P)`, so ranks own non overlapping, strictly increasing ranges and
/// the last rank absorbs any key above its nominal interval.
///
/// The plan is a pure function of `(min, max, P)`, every process must build it from the same
/// parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangePartitionPlan<T: Key> {
    min: T,
    max: T,
    n_processes: usize,
    interval_width: i128,
}

impl<T: Key> RangePartitionPlan<T> {
    /// Constructor, fails with a configuration error if the plan would have a zero interval width.
    ///
    /// # Arguments
    /// * `min` - Smallest key of the global dataset.
    /// * `max` - Largest key of the global dataset.
    /// * `n_processes` - Number of cooperating processes.
    pub fn new(min: T, max: T, n_processes: usize) -> Result<Self> {
        if n_processes == 0 {
            return Err(Error::Configuration(
                "at least one process is required".to_string(),
            ));
        }

        if min > max {
            return Err(Error::Configuration(format!(
                "minimum {} exceeds maximum {}",
                min, max
            )));
        }

        let span = max.widen() - min.widen() + 1;
        let n = n_processes as i128;

        // Fewer values than processes, truncating division would yield a zero width
        if span < n {
            return Err(Error::Configuration(format!(
                "value range [{}, {}] holds {} values, fewer than the {} processes",
                min, max, span, n_processes
            )));
        }

        let interval_width = (span + n - 1) / n;

        Ok(Self {
            min,
            max,
            n_processes,
            interval_width,
        })
    }

    /// Rank of the process owning `value`.
    #[inline]
    pub fn owner(&self, value: T) -> usize {
        let offset = value.widen() - self.min.widen();
        if offset <= 0 {
            return 0;
        }
        let index = offset / self.interval_width;
        index.min(self.n_processes as i128 - 1) as usize
    }

    /// Nominal inclusive key range owned by `rank`, `None` if the rank owns no keys of `[min, max]`
    /// or does not exist.
    pub fn range(&self, rank: usize) -> Option<(T, T)> {
        if rank >= self.n_processes {
            return None;
        }

        let lower = self.min.widen() + rank as i128 * self.interval_width;
        if lower > self.max.widen() {
            return None;
        }

        let upper = if rank == self.n_processes - 1 {
            self.max.widen()
        } else {
            (lower + self.interval_width - 1).min(self.max.widen())
        };

        Some((T::narrow(lower)?, T::narrow(upper)?))
    }

    /// Number of cooperating processes.
    pub fn n_processes(&self) -> usize {
        self.n_processes
    }

    /// Width of the key interval owned by each process.
    pub fn interval_width(&self) -> u128 {
        self.interval_width as u128
    }
}

/// Keys of a local slice grouped by owning process, bucket `i` holds the keys owned by rank `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buckets<T> {
    buckets: Vec<Vec<T>>,
}

impl<T: Copy> Buckets<T> {
    /// Number of keys per bucket, in increasing target rank.
    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }

    /// Total number of keys across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Number of buckets, one per process.
    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Keys destined to `target`.
    pub fn bucket(&self, target: usize) -> &[T] {
        &self.buckets[target]
    }

    /// Concatenate the buckets in increasing target order into a flat send buffer.
    pub fn into_flat(self) -> Vec<T> {
        let mut flat = Vec::with_capacity(self.len());
        for bucket in self.buckets {
            flat.extend(bucket);
        }
        flat
    }
}

/// Classify each key of a local slice into the bucket of its owning process. The sizes of the
/// returned buckets sum to the length of `slice`.
///
/// # Arguments
/// * `slice` - Keys held by the calling process.
/// * `plan` - Partition plan shared by all processes.
pub fn partition<T: Key>(slice: &[T], plan: &RangePartitionPlan<T>) -> Buckets<T> {
    let mut buckets = vec![Vec::new(); plan.n_processes()];

    for &value in slice.iter() {
        buckets[plan.owner(value)].push(value);
    }

    Buckets { buckets }
}
