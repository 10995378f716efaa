//! Distributed bucket sort and its phases
pub mod bucketsort;
pub mod exchange;
pub mod gather;
pub mod local_sort;
pub mod partition;

pub use bucketsort::{bucket_sort, BucketSortOutput};
pub use exchange::{exchange, negotiate, ExchangePlan};
pub use gather::gather_sorted;
pub use local_sort::{local_sort, LocalSortKind};
pub use partition::{partition, Buckets, RangePartitionPlan};
