//? mpirun -n {{NPROCESSES}} --features "mpi"

#[cfg(feature = "mpi")]
#[allow(dead_code)]
mod mpi_test {

    use bucketsort::{
        bucket_sort, generator::generate, BucketSortConfig, Distribution, Error, Key,
        MpiTransport, RemainderPolicy, Transport,
    };
    use mpi::{
        topology::SimpleCommunicator,
        traits::{Communicator, Destination, Source},
    };

    /// Check that the partitions are locally sorted and that the largest key of each rank is
    /// smaller than the smallest key of the next non empty rank.
    fn test_partitions<T: Key>(partition: &[T], comm: &SimpleCommunicator, label: &str) {
        let rank = comm.rank();
        let size = comm.size();

        for pair in partition.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        // Empty partitions forward the bound received from the right
        let mut partner_min = T::max_value();
        if rank < size - 1 {
            comm.process_at_rank(rank + 1).receive_into(&mut partner_min);
        }

        if let Some(&max) = partition.last() {
            assert!(max < partner_min || (rank == size - 1));
        }

        let min = partition.first().copied().unwrap_or(partner_min);
        if rank > 0 {
            comm.process_at_rank(rank - 1).send(&min);
        }

        if rank == 0 {
            println!("...test_{} passed", label)
        }
    }

    fn test_sorted<T: Key>(dataset: &[T], sorted: &[T], label: &str) {
        let mut expected = dataset.to_vec();
        expected.sort();
        assert_eq!(sorted, &expected[..]);
        println!("...test_{} gathered passed", label)
    }

    pub fn main() {
        // Setup MPI
        let universe = mpi::initialize().unwrap();
        let world = universe.world();
        let comm = MpiTransport::new(&world);
        let size = comm.size();

        // Random keys over each distribution, with a remainder
        for distribution in [
            Distribution::Uniform,
            Distribution::Normal,
            Distribution::Exponential,
        ] {
            let n = 10_000 + size - 1;
            let config = BucketSortConfig::new(n, 0i32, 100_000).with_distribution(distribution);
            let dataset = generate(n, 0i32, 100_000, distribution, Some(0)).unwrap();
            let data = comm.context().is_coordinator().then_some(&dataset[..]);

            let output = bucket_sort(data, &config, &comm).unwrap();
            let label = format!("bucket_sort_{}", distribution);
            test_partitions(&output.partition, comm.communicator(), &label);

            if let Some(sorted) = output.sorted {
                test_sorted(&dataset, &sorted, &label);
                let summary = output.summary.unwrap();
                assert_eq!(summary.total_size, n);
            }
        }

        // Duplicates only
        {
            let n = 4 * size;
            let config = BucketSortConfig::new(n, 0u64, 3 * size as u64);
            let dataset = vec![size as u64; n];
            let data = comm.context().is_coordinator().then_some(&dataset[..]);

            let output = bucket_sort(data, &config, &comm).unwrap();
            test_partitions(&output.partition, comm.communicator(), "bucket_sort_duplicates");
            if let Some(sorted) = output.sorted {
                test_sorted(&dataset, &sorted, "bucket_sort_duplicates");
            }
        }

        // Uneven division is rejected identically on every rank
        if size > 1 {
            let n = 10 * size + 1;
            let config =
                BucketSortConfig::new(n, 0i64, 1_000).with_remainder(RemainderPolicy::Reject);
            let dataset = generate(n, 0i64, 1_000, Distribution::Uniform, Some(1)).unwrap();
            let data = comm.context().is_coordinator().then_some(&dataset[..]);

            let result = bucket_sort(data, &config, &comm);
            assert!(matches!(result, Err(Error::Configuration(_))));

            if comm.context().is_coordinator() {
                println!("...test_bucket_sort_reject passed")
            }
        }

        // A value range narrower than the process count is rejected identically on every rank
        if size > 1 {
            let max = size as i32 - 2;
            let config = BucketSortConfig::new(size, 0i32, max);
            let dataset = vec![0i32; size];
            let data = comm.context().is_coordinator().then_some(&dataset[..]);

            let result = bucket_sort(data, &config, &comm);
            assert!(matches!(result, Err(Error::Configuration(_))));

            if comm.context().is_coordinator() {
                println!("...test_bucket_sort_narrow_range passed")
            }
        }
    }
}

#[cfg(feature = "mpi")]
use mpi_test::main;

#[cfg(not(feature = "mpi"))]
fn main() {}
