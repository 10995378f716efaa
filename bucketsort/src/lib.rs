//! # Distributed Bucket Sort
//!
//! Sorts `N` fixed width integer keys spread over `P` cooperating processes using only collective
//! message passing, no shared memory.
//!
//! The dataset is scattered from a coordinating process, each process range partitions its slice
//! into one bucket per owning process, the buckets are redistributed with a variable count all to all
//! exchange, every process sorts the keys it now owns, and the sorted partitions are gathered back in
//! rank order. As each rank owns a contiguous, strictly increasing value range the gathered sequence
//! is globally sorted without any merge step.
//!
//! Notable features of this library are:
//! * A [`Transport`](traits::transport::Transport) abstraction over the collectives used, with an MPI
//!   implementation (feature `mpi`) and an in-process implementation for deterministic testing.
//! * An explicit [`ExecutionContext`](traits::types::ExecutionContext) in place of ambient process identity.
//! * Per phase instrumentation, reduced to global maxima on the coordinator, and a load balance report.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod config;
pub mod generator;
pub mod helpers;
pub mod instrumentation;
pub mod sorting;
pub mod traits;
pub mod transport;

// Public API
#[doc(inline)]
pub use config::{BucketSortConfig, Distribution, RemainderPolicy};
#[doc(inline)]
pub use sorting::{bucket_sort, BucketSortOutput, LocalSortKind, RangePartitionPlan};
#[doc(inline)]
pub use traits::transport::Transport;
#[doc(inline)]
pub use traits::types::{Error, ExecutionContext, Key, Payload, Result, COORDINATOR_RANK};
#[doc(inline)]
pub use transport::{LocalCluster, LocalTransport};

#[cfg(feature = "mpi")]
#[doc(inline)]
pub use transport::MpiTransport;
