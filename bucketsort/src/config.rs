//! Run configuration, validated identically on every process before any collective is issued.
use std::{fmt, str::FromStr};

use crate::{
    sorting::{LocalSortKind, RangePartitionPlan},
    traits::types::{Error, Key, Result},
};

/// Shape of the values produced by the generator, the sort itself is agnostic to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Distribution {
    /// Uniform integers over `[min, max]`
    #[default]
    Uniform,

    /// Normal with mean `(min + max) / 2` and standard deviation `(max - min) / 6`
    Normal,

    /// Exponential with mean `(min + max) / 2`
    Exponential,
}

/// Treatment of the `N mod P` elements left over when the dataset does not divide evenly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// The first `N mod P` processes receive one extra element.
    #[default]
    Distribute,

    /// Every process receives `N / P` elements, the trailing remainder is dropped and reported.
    Truncate,

    /// An uneven division is a configuration error.
    Reject,
}

/// Parameters of a bucket sort run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketSortConfig<T: Key> {
    /// Number of keys in the global dataset
    pub n_elements: usize,

    /// Smallest admissible key
    pub min: T,

    /// Largest admissible key
    pub max: T,

    /// Distribution requested from the generator
    pub distribution: Distribution,

    /// Treatment of an uneven division of the dataset
    pub remainder: RemainderPolicy,

    /// Strategy for sorting owned partitions
    pub local_sort: LocalSortKind,

    /// Generator seed, entropy if unset
    pub seed: Option<u64>,
}

impl<T: Key> BucketSortConfig<T> {
    /// Constructor with default policies.
    pub fn new(n_elements: usize, min: T, max: T) -> Self {
        Self {
            n_elements,
            min,
            max,
            distribution: Distribution::default(),
            remainder: RemainderPolicy::default(),
            local_sort: LocalSortKind::default(),
            seed: None,
        }
    }

    /// Set the generator distribution
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Set the remainder policy
    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Set the local sort strategy
    pub fn with_local_sort(mut self, local_sort: LocalSortKind) -> Self {
        self.local_sort = local_sort;
        self
    }

    /// Set the generator seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the configuration for `n_processes` processes and build the shared partition plan.
    /// Every process reaches the same verdict as only global parameters are inspected.
    pub fn validate(&self, n_processes: usize) -> Result<RangePartitionPlan<T>> {
        let plan = RangePartitionPlan::new(self.min, self.max, n_processes)?;
        self.scatter_counts(n_processes)?;
        Ok(plan)
    }

    /// Number of elements scattered to each process under the remainder policy.
    pub fn scatter_counts(&self, n_processes: usize) -> Result<Vec<usize>> {
        if n_processes == 0 {
            return Err(Error::Configuration(
                "at least one process is required".to_string(),
            ));
        }

        let base = self.n_elements / n_processes;
        let remainder = self.n_elements % n_processes;

        match self.remainder {
            RemainderPolicy::Distribute => Ok((0..n_processes)
                .map(|rank| base + usize::from(rank < remainder))
                .collect()),
            RemainderPolicy::Truncate => Ok(vec![base; n_processes]),
            RemainderPolicy::Reject => {
                if remainder != 0 {
                    Err(Error::Configuration(format!(
                        "{} elements do not divide evenly over {} processes",
                        self.n_elements, n_processes
                    )))
                } else {
                    Ok(vec![base; n_processes])
                }
            }
        }
    }

    /// Number of trailing elements left out of the scatter for `n_processes` processes.
    pub fn dropped(&self, n_processes: usize) -> usize {
        match self.remainder {
            RemainderPolicy::Truncate if n_processes > 0 => self.n_elements % n_processes,
            _ => 0,
        }
    }
}

impl FromStr for Distribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" | "u" => Ok(Distribution::Uniform),
            "normal" | "n" => Ok(Distribution::Normal),
            "exponential" | "e" => Ok(Distribution::Exponential),
            other => Err(Error::Configuration(format!(
                "unknown distribution '{}', expected uniform, normal or exponential",
                other
            ))),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Uniform => write!(f, "uniform"),
            Distribution::Normal => write!(f, "normal"),
            Distribution::Exponential => write!(f, "exponential"),
        }
    }
}

impl FromStr for RemainderPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "distribute" => Ok(RemainderPolicy::Distribute),
            "truncate" => Ok(RemainderPolicy::Truncate),
            "reject" => Ok(RemainderPolicy::Reject),
            other => Err(Error::Configuration(format!(
                "unknown remainder policy '{}', expected distribute, truncate or reject",
                other
            ))),
        }
    }
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainderPolicy::Distribute => write!(f, "distribute"),
            RemainderPolicy::Truncate => write!(f, "truncate"),
            RemainderPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for LocalSortKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unstable" => Ok(LocalSortKind::Unstable),
            "parallel" => Ok(LocalSortKind::Parallel),
            other => Err(Error::Configuration(format!(
                "unknown local sort '{}', expected unstable or parallel",
                other
            ))),
        }
    }
}

impl fmt::Display for LocalSortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSortKind::Unstable => write!(f, "unstable"),
            LocalSortKind::Parallel => write!(f, "parallel"),
        }
    }
}
