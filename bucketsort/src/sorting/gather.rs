//! Collection of the sorted partitions at the coordinator.
use tracing::debug;

use crate::traits::{
    transport::Transport,
    types::{Key, Result},
};

/// Gather every process' sorted partition at the coordinator, concatenated in increasing rank order.
/// As ranks own increasing key ranges the result is globally sorted, `None` on other processes.
///
/// # Arguments
/// * `partition` - Sorted keys owned by the calling process.
/// * `comm` - Transport shared by all processes.
pub fn gather_sorted<T, C>(partition: &[T], comm: &C) -> Result<Option<Vec<T>>>
where
    T: Key,
    C: Transport,
{
    // Partition sizes define the receive layout at the coordinator
    let counts = comm.gather(partition.len())?;
    let gathered = comm.gather_varcount(partition, counts.as_deref())?;

    if let Some(gathered) = gathered.as_ref() {
        debug!(
            rank = comm.rank(),
            n_elements = gathered.len(),
            "gathered sorted partitions"
        );
    }

    Ok(gathered)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::LocalCluster;

    #[test]
    fn test_gather_in_rank_order() {
        let results = LocalCluster::new(3).run(|comm| {
            // Rank r owns r + 1 keys in [10r, 10r + r]
            let rank = comm.rank() as u32;
            let partition = (0..=rank).map(|i| 10 * rank + i).collect::<Vec<_>>();
            gather_sorted(&partition, &comm)
        });

        let results = results.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>();
        assert_eq!(results[0], Some(vec![0, 10, 11, 20, 21, 22]));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
    }

    #[test]
    fn test_gather_empty_partitions() {
        let results = LocalCluster::new(4).run(|comm| {
            let partition: Vec<i32> = if comm.rank() == 2 { vec![1, 2] } else { Vec::new() };
            gather_sorted(&partition, &comm)
        });
        assert_eq!(results[0].as_ref().unwrap(), &Some(vec![1, 2]));
    }
}
