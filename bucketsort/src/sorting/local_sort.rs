//! Sorting of the keys a process owns after the exchange.
use rayon::slice::ParallelSliceMut;

use crate::traits::types::Key;

/// Strategy used to sort an owned partition. Neither strategy is stable, equal keys may reorder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocalSortKind {
    /// Single threaded pattern defeating quicksort.
    #[default]
    Unstable,

    /// Multithreaded sort on the current rayon thread pool.
    Parallel,
}

/// Sort an owned partition ascending, in place.
///
/// # Arguments
/// * `partition` - Keys owned by the calling process.
/// * `kind` - Sorting strategy.
pub fn local_sort<T: Key>(partition: &mut [T], kind: LocalSortKind) {
    match kind {
        LocalSortKind::Unstable => partition.sort_unstable(),
        LocalSortKind::Parallel => partition.par_sort_unstable(),
    }
}
